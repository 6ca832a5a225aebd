//! SQLite storage for the Pebble ingestion server.
//!
//! Persists devices, firmware apps and telemetry records.

mod db;
mod models;
mod queries;
mod queries_records;


pub use db::PebbleDatabase;
pub use models::*;
pub use pebble_core::db::DatabaseError;
