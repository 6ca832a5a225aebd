//! Data models for Pebble storage.

use serde::{Deserialize, Serialize};

/// Lifecycle of a device registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum DeviceStatus {
    Created = 0,
    Proposal = 1,
    Confirmed = 2,
}

impl DeviceStatus {
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Created),
            1 => Some(Self::Proposal),
            2 => Some(Self::Confirmed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub id: String,
    /// EIP-55 address of the controlling account.
    pub owner: String,
    pub address: String,
    pub status: i32,
    pub proposer: String,
    /// `"<appID> <version>"` as last reported by the device, or empty.
    pub real_firmware: String,
    pub bulk_upload: i32,
    pub data_channel: i32,
    pub upload_period: i32,
    pub bulk_upload_sampling_cnt: i32,
    pub bulk_upload_sampling_freq: i32,
    pub beep: i32,
    pub configurable: bool,
    pub state: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Device {
    pub const fn status(&self) -> Option<DeviceStatus> {
        DeviceStatus::from_i32(self.status)
    }
}

/// Identity columns written when a device is first registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDevice {
    pub id: String,
    pub owner: String,
    pub address: String,
    pub status: DeviceStatus,
    pub proposer: String,
}

/// Operating parameters reported in a config message. Replaces all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceConfigUpdate {
    pub bulk_upload: i32,
    pub data_channel: i32,
    pub upload_period: i32,
    pub bulk_upload_sampling_cnt: i32,
    pub bulk_upload_sampling_freq: i32,
    pub beep: i32,
    pub real_firmware: String,
    pub configurable: bool,
}

/// Firmware application metadata.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct App {
    pub id: String,
    pub uri: String,
    pub version: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceRecord {
    pub id: String,
    pub imei: String,
    pub timestamp: i64,
    pub signature: String,
    pub operator: String,
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
    pub created_at: i64,
    pub updated_at: i64,
}

/// A calibrated telemetry sample ready to be stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewDeviceRecord {
    pub id: String,
    pub imei: String,
    pub timestamp: i64,
    pub signature: String,
    pub operator: String,
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

/// Primary key of a telemetry record: `"<deviceID>-<timestamp>"`.
///
/// The timestamp is the device clock, so two samples sharing it share a row.
pub fn record_key(device_id: &str, timestamp: u32) -> String {
    format!("{device_id}-{timestamp}")
}
