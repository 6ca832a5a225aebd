//! Pebble Server Library
//!
//! Authenticated telemetry ingestion for Pebble devices:
//! - SQLite storage for devices, firmware apps and telemetry records
//! - On-chain ownership lookups through an ioID oracle
//! - Device directory with first-contact registration
//! - Envelope decoding, calibration and dispatch
//! - HTTP routes for the query and submit operations

pub mod directory;
pub mod dispatch;
pub mod envelope;
pub mod normalize;
pub mod oracle;
pub mod routes;
pub mod service;
pub mod storage;
