//! Calibration of raw sensor codes into persisted decimal strings.
//!
//! The piecewise functions and thresholds below are what deployed devices
//! and downstream consumers agree on. They are reproduced as-is, including
//! the battery clamp that returns `0.1` and `100` on different scales.

use pebble_proto::SensorData;

/// Signal-to-noise code at or above which the reading saturates.
pub const SNR_HIGH_RAW: f64 = 2700.0;
/// Signal-to-noise code below which the reading bottoms out.
pub const SNR_LOW_RAW: f64 = 700.0;
pub const SNR_HIGH: f64 = 100.0;
pub const SNR_LOW: f64 = 25.0;
/// Percent per code step between the two thresholds.
pub const SNR_SLOPE: f64 = 0.0375;

/// Battery code that maps to an empty cell.
pub const VBAT_OFFSET: f64 = 320.0;
/// Battery codes spanning an empty-to-full cell.
pub const VBAT_SPAN: f64 = 90.0;
pub const VBAT_FULL_FRACTION: f64 = 1.0;
pub const VBAT_MIN_FRACTION: f64 = 0.1;
pub const VBAT_FULL: f64 = 100.0;
pub const VBAT_MIN: f64 = 0.1;

/// Decimal places of latitude and longitude (`raw / 10^7`).
pub const COORDINATE_SCALE: u32 = 7;
/// Decimal places of environmental readings (`raw / 10^2`).
pub const ENVIRONMENT_SCALE: u32 = 2;

/// Calibrated readings of one sample, formatted for storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calibrated {
    pub snr: String,
    pub vbat: String,
    pub latitude: String,
    pub longitude: String,
    pub gas_resistance: String,
    pub temperature: String,
    pub temperature2: String,
    pub pressure: String,
    pub humidity: String,
    pub light: String,
    pub gyroscope: String,
    pub accelerometer: String,
}

/// Calibrate every reading of `data`.
pub fn calibrate(data: &SensorData) -> Calibrated {
    Calibrated {
        snr: snr(data.snr),
        vbat: vbat(data.vbat),
        latitude: fixed_point(i64::from(data.latitude), COORDINATE_SCALE),
        longitude: fixed_point(i64::from(data.longitude), COORDINATE_SCALE),
        gas_resistance: environment(wrap_signed(data.gas_resistance)),
        temperature: environment(data.temperature),
        temperature2: environment(wrap_signed(data.temperature2)),
        pressure: environment(wrap_signed(data.pressure)),
        humidity: environment(wrap_signed(data.humidity)),
        light: environment(wrap_signed(data.light)),
        gyroscope: vector_json(&data.gyroscope),
        accelerometer: vector_json(&data.accelerometer),
    }
}

/// Signal quality in percent, one decimal.
#[allow(clippy::suboptimal_flops)]
pub fn snr(raw: u32) -> String {
    let raw = f64::from(raw);
    let value = if raw > SNR_HIGH_RAW {
        SNR_HIGH
    } else if raw < SNR_LOW_RAW {
        SNR_LOW
    } else {
        (raw - SNR_LOW_RAW) * SNR_SLOPE + SNR_LOW
    };
    format!("{value:.1}")
}

/// Battery level, one decimal.
pub fn vbat(raw: u32) -> String {
    let fraction = (f64::from(raw) - VBAT_OFFSET) / VBAT_SPAN;
    let value = if fraction > VBAT_FULL_FRACTION {
        VBAT_FULL
    } else if fraction < VBAT_MIN_FRACTION {
        VBAT_MIN
    } else {
        fraction * 100.0
    };
    format!("{value:.1}")
}

fn environment(raw: i32) -> String {
    fixed_point(i64::from(raw), ENVIRONMENT_SCALE)
}

/// Unsigned device codes are stored and calibrated as two's-complement
/// 32-bit values.
#[allow(clippy::cast_possible_wrap)]
pub(crate) const fn wrap_signed(raw: u32) -> i32 {
    raw as i32
}

/// Render `raw / 10^scale` exactly with `scale` decimal places.
pub fn fixed_point(raw: i64, scale: u32) -> String {
    let divisor = 10u64.pow(scale);
    let magnitude = raw.unsigned_abs();
    let sign = if raw < 0 { "-" } else { "" };
    let width = scale as usize;
    format!(
        "{sign}{}.{:0width$}",
        magnitude / divisor,
        magnitude % divisor
    )
}

/// JSON array text of a vector; an empty vector is `null`.
pub fn vector_json(values: &[i32]) -> String {
    if values.is_empty() {
        return "null".to_string();
    }
    let items: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snr_boundaries() {
        assert_eq!(snr(2700), "100.0");
        assert_eq!(snr(2701), "100.0");
        assert_eq!(snr(700), "25.0");
        assert_eq!(snr(699), "25.0");
        assert_eq!(snr(0), "25.0");
        assert_eq!(snr(1700), "62.5");
    }

    #[test]
    fn snr_linear_segment() {
        assert_eq!(snr(1100), "40.0");
        assert_eq!(snr(2300), "85.0");
    }

    #[test]
    fn vbat_boundaries() {
        assert_eq!(vbat(320), "0.1");
        assert_eq!(vbat(0), "0.1");
        assert_eq!(vbat(410), "100.0");
        assert_eq!(vbat(500), "100.0");
        assert_eq!(vbat(365), "50.0");
    }

    #[test]
    fn vbat_low_clamp_is_not_scaled() {
        // 328 -> fraction 0.088..., below the floor, stays 0.1 rather than 10.0
        assert_eq!(vbat(328), "0.1");
        // 329 -> fraction 0.1 exactly is inside the linear segment
        assert_eq!(vbat(329), "10.0");
    }

    #[test]
    fn coordinates_have_seven_places() {
        assert_eq!(fixed_point(123_456_789, COORDINATE_SCALE), "12.3456789");
        assert_eq!(fixed_point(-123_456_789, COORDINATE_SCALE), "-12.3456789");
        assert_eq!(fixed_point(5, COORDINATE_SCALE), "0.0000005");
        assert_eq!(fixed_point(-5, COORDINATE_SCALE), "-0.0000005");
        assert_eq!(fixed_point(0, COORDINATE_SCALE), "0.0000000");
        assert_eq!(
            fixed_point(i64::from(i32::MIN), COORDINATE_SCALE),
            "-214.7483648"
        );
    }

    #[test]
    fn environment_has_two_places() {
        assert_eq!(environment(2150), "21.50");
        assert_eq!(environment(-5), "-0.05");
        assert_eq!(environment(100_000), "1000.00");
    }

    #[test]
    fn unsigned_codes_wrap_to_signed() {
        assert_eq!(environment(wrap_signed(u32::MAX)), "-0.01");
        assert_eq!(environment(wrap_signed(101_325)), "1013.25");
    }

    #[test]
    fn vectors_render_as_json() {
        assert_eq!(vector_json(&[1, -2, 3]), "[1,-2,3]");
        assert_eq!(vector_json(&[]), "null");
    }

    #[test]
    fn calibrate_maps_every_field() {
        let data = SensorData {
            snr: 1700,
            vbat: 365,
            latitude: 123_456_789,
            longitude: -987_654_321,
            gas_resistance: 12_345,
            temperature: -1_050,
            pressure: 101_325,
            humidity: 4_550,
            light: 7,
            temperature2: 2_000,
            gyroscope: vec![1, 2, 3],
            accelerometer: Vec::new(),
            random: String::new(),
        };
        let out = calibrate(&data);
        assert_eq!(
            out,
            Calibrated {
                snr: "62.5".into(),
                vbat: "50.0".into(),
                latitude: "12.3456789".into(),
                longitude: "-98.7654321".into(),
                gas_resistance: "123.45".into(),
                temperature: "-10.50".into(),
                temperature2: "20.00".into(),
                pressure: "1013.25".into(),
                humidity: "45.50".into(),
                light: "0.07".into(),
                gyroscope: "[1,2,3]".into(),
                accelerometer: "null".into(),
            }
        );
    }
}
