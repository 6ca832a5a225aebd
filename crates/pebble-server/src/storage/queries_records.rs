//! Telemetry record queries.

use pebble_core::db::{DatabaseError, unix_timestamp};

use super::db::PebbleDatabase;
use super::models::{DeviceRecord, NewDeviceRecord};

impl PebbleDatabase {
    /// Store a telemetry record. A record with the same key is overwritten
    /// in place, keeping its original `created_at`.
    pub async fn upsert_device_record(
        &self,
        record: &NewDeviceRecord,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO device_records (
                id, imei, timestamp, signature, operator, snr, vbat, latitude, longitude,
                gas_resistance, temperature, temperature2, pressure, humidity, light,
                gyroscope, accelerometer, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                imei = excluded.imei,
                timestamp = excluded.timestamp,
                signature = excluded.signature,
                operator = excluded.operator,
                snr = excluded.snr,
                vbat = excluded.vbat,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                gas_resistance = excluded.gas_resistance,
                temperature = excluded.temperature,
                temperature2 = excluded.temperature2,
                pressure = excluded.pressure,
                humidity = excluded.humidity,
                light = excluded.light,
                gyroscope = excluded.gyroscope,
                accelerometer = excluded.accelerometer,
                updated_at = excluded.updated_at",
        )
        .bind(&record.id)
        .bind(&record.imei)
        .bind(record.timestamp)
        .bind(&record.signature)
        .bind(&record.operator)
        .bind(&record.snr)
        .bind(&record.vbat)
        .bind(&record.latitude)
        .bind(&record.longitude)
        .bind(&record.gas_resistance)
        .bind(&record.temperature)
        .bind(&record.temperature2)
        .bind(&record.pressure)
        .bind(&record.humidity)
        .bind(&record.light)
        .bind(&record.gyroscope)
        .bind(&record.accelerometer)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Get a telemetry record by its composite key.
    pub async fn get_device_record(&self, id: &str) -> Result<Option<DeviceRecord>, DatabaseError> {
        let record =
            sqlx::query_as::<_, DeviceRecord>("SELECT * FROM device_records WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        Ok(record)
    }

    /// Most recent records of a device, newest device timestamp first.
    pub async fn list_device_records(
        &self,
        device_id: &str,
        limit: i64,
    ) -> Result<Vec<DeviceRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, DeviceRecord>(
            "SELECT * FROM device_records WHERE imei = ? ORDER BY timestamp DESC LIMIT ?",
        )
        .bind(device_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(records)
    }
}
