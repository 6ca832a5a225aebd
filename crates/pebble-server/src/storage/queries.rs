//! Device and app queries.

use pebble_core::db::{DatabaseError, unix_timestamp};

use super::db::PebbleDatabase;
use super::models::{App, Device, DeviceConfigUpdate, NewDevice};

impl PebbleDatabase {
    // =========================================================================
    // Device queries
    // =========================================================================

    /// Look up a device by id.
    pub async fn get_device(&self, id: &str) -> Result<Option<Device>, DatabaseError> {
        let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(device)
    }

    /// Insert a device, or overwrite the identity columns of an existing row
    /// with the same id. Operating parameters of an existing row are kept.
    pub async fn upsert_device(&self, device: &NewDevice) -> Result<Device, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO devices (id, owner, address, status, proposer, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                owner = excluded.owner,
                address = excluded.address,
                status = excluded.status,
                proposer = excluded.proposer,
                updated_at = excluded.updated_at",
        )
        .bind(&device.id)
        .bind(&device.owner)
        .bind(&device.address)
        .bind(device.status.as_i32())
        .bind(&device.proposer)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_device(&device.id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Device {}", device.id)))
    }

    /// Replace the operating parameters of a device.
    pub async fn update_device_config(
        &self,
        id: &str,
        config: &DeviceConfigUpdate,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE devices SET
                bulk_upload = ?,
                data_channel = ?,
                upload_period = ?,
                bulk_upload_sampling_cnt = ?,
                bulk_upload_sampling_freq = ?,
                beep = ?,
                real_firmware = ?,
                configurable = ?,
                updated_at = ?
             WHERE id = ?",
        )
        .bind(config.bulk_upload)
        .bind(config.data_channel)
        .bind(config.upload_period)
        .bind(config.bulk_upload_sampling_cnt)
        .bind(config.bulk_upload_sampling_freq)
        .bind(config.beep)
        .bind(&config.real_firmware)
        .bind(config.configurable)
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Device {id}")));
        }
        Ok(())
    }

    /// Overwrite the reported state of a device.
    pub async fn update_device_state(&self, id: &str, state: i32) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE devices SET state = ?, updated_at = ? WHERE id = ?")
            .bind(state)
            .bind(unix_timestamp())
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Device {id}")));
        }
        Ok(())
    }

    // =========================================================================
    // App queries
    // =========================================================================

    /// Look up firmware app metadata by app id.
    pub async fn get_app(&self, id: &str) -> Result<Option<App>, DatabaseError> {
        let app = sqlx::query_as::<_, App>("SELECT * FROM apps WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(app)
    }

    /// Register or replace firmware app metadata.
    pub async fn upsert_app(
        &self,
        id: &str,
        uri: &str,
        version: &str,
    ) -> Result<App, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO apps (id, uri, version, created_at, updated_at) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                uri = excluded.uri,
                version = excluded.version,
                updated_at = excluded.updated_at",
        )
        .bind(id)
        .bind(uri)
        .bind(version)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_app(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("App {id}")))
    }
}
