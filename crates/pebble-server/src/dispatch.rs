//! Routing of decoded sub-messages to their store updates.

use pebble_proto::{SensorConfig, SensorData};
use tracing::debug;

use crate::envelope::{Envelope, SensorMessage};
use crate::normalize::{calibrate, wrap_signed};
use crate::storage::{
    DatabaseError, DeviceConfigUpdate, NewDeviceRecord, PebbleDatabase, record_key,
};

/// What a dispatched message changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Config,
    State(i32),
    /// Key of the stored telemetry record.
    Record(String),
}

/// Apply one decoded message for `device_id`.
///
/// Each path is a single write, so repeating a message leaves the store as
/// the last repetition wrote it.
pub async fn dispatch(
    db: &PebbleDatabase,
    device_id: &str,
    envelope: &Envelope,
    message: &SensorMessage,
) -> Result<Applied, DatabaseError> {
    debug!(
        device_id,
        kind = message.kind(),
        timestamp = envelope.timestamp,
        "Dispatching message"
    );
    match message {
        SensorMessage::Config(config) => {
            db.update_device_config(device_id, &config_update(config))
                .await?;
            debug!(device_id, "Device config replaced");
            Ok(Applied::Config)
        }
        SensorMessage::State(state) => {
            let state = wrap_signed(state.state);
            db.update_device_state(device_id, state).await?;
            debug!(device_id, state, "Device state replaced");
            Ok(Applied::State(state))
        }
        SensorMessage::Data(data) => {
            let record = telemetry_record(device_id, envelope, data);
            db.upsert_device_record(&record).await?;
            debug!(device_id, record_id = %record.id, "Telemetry record stored");
            Ok(Applied::Record(record.id))
        }
    }
}

fn config_update(config: &SensorConfig) -> DeviceConfigUpdate {
    DeviceConfigUpdate {
        bulk_upload: wrap_signed(config.bulk_upload),
        data_channel: wrap_signed(config.data_channel),
        upload_period: wrap_signed(config.upload_period),
        bulk_upload_sampling_cnt: wrap_signed(config.bulk_upload_sampling_cnt),
        bulk_upload_sampling_freq: wrap_signed(config.bulk_upload_sampling_freq),
        beep: wrap_signed(config.beep),
        real_firmware: config.firmware.clone(),
        configurable: config.device_configurable,
    }
}

/// Build the stored record for a telemetry sample.
///
/// The envelope signature is stored hex encoded with one zero byte appended;
/// existing consumers expect that trailing byte.
pub fn telemetry_record(
    device_id: &str,
    envelope: &Envelope,
    data: &SensorData,
) -> NewDeviceRecord {
    let calibrated = calibrate(data);

    let mut signature = envelope.signature.clone();
    signature.push(0);

    NewDeviceRecord {
        id: record_key(device_id, envelope.timestamp),
        imei: device_id.to_string(),
        timestamp: i64::from(envelope.timestamp),
        signature: hex::encode(signature),
        operator: String::new(),
        snr: calibrated.snr,
        vbat: calibrated.vbat,
        latitude: calibrated.latitude,
        longitude: calibrated.longitude,
        gas_resistance: calibrated.gas_resistance,
        temperature: calibrated.temperature,
        temperature2: calibrated.temperature2,
        pressure: calibrated.pressure,
        humidity: calibrated.humidity,
        light: calibrated.light,
        gyroscope: calibrated.gyroscope,
        accelerometer: calibrated.accelerometer,
    }
}
