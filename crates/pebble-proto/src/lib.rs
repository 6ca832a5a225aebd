//! Pebble Protocol Buffers
//!
//! Message definitions for the binary envelope that Pebble devices post,
//! mirroring `proto/pebble/v1/sensor.proto`. The structs are written with
//! `prost` derives directly so no `protoc` step is needed at build time.
//!
//! This crate contains:
//! - `BinPackage`, the outer envelope (timestamp, signature, type, data)
//! - `SensorConfig`, `SensorState` and `SensorData`, the three sub-messages

#![allow(clippy::derive_partial_eq_without_eq)]

/// Pebble v1 wire definitions.
pub mod v1 {
    /// Outer envelope carrying one type-tagged sub-message.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BinPackage {
        #[prost(enumeration = "bin_package::PackageType", tag = "1")]
        pub r#type: i32,
        #[prost(uint32, tag = "2")]
        pub timestamp: u32,
        #[prost(bytes = "vec", tag = "3")]
        pub data: ::prost::alloc::vec::Vec<u8>,
        #[prost(bytes = "vec", tag = "4")]
        pub signature: ::prost::alloc::vec::Vec<u8>,
    }

    /// Nested types for [`BinPackage`].
    pub mod bin_package {
        /// Discriminant selecting the shape of `BinPackage.data`.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum PackageType {
            Config = 0,
            State = 1,
            Data = 2,
        }
    }

    /// Device operating parameters.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SensorConfig {
        #[prost(uint32, tag = "1")]
        pub bulk_upload: u32,
        #[prost(uint32, tag = "2")]
        pub data_channel: u32,
        #[prost(uint32, tag = "3")]
        pub upload_period: u32,
        #[prost(uint32, tag = "4")]
        pub bulk_upload_sampling_cnt: u32,
        #[prost(uint32, tag = "5")]
        pub bulk_upload_sampling_freq: u32,
        #[prost(uint32, tag = "6")]
        pub beep: u32,
        #[prost(string, tag = "7")]
        pub firmware: ::prost::alloc::string::String,
        #[prost(bool, tag = "8")]
        pub device_configurable: bool,
    }

    /// Device state report.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SensorState {
        #[prost(uint32, tag = "1")]
        pub state: u32,
    }

    /// Raw sensor sample. Values are device codes, not physical units.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SensorData {
        #[prost(uint32, tag = "1")]
        pub snr: u32,
        #[prost(uint32, tag = "2")]
        pub vbat: u32,
        #[prost(sint32, tag = "3")]
        pub latitude: i32,
        #[prost(sint32, tag = "4")]
        pub longitude: i32,
        #[prost(uint32, tag = "5")]
        pub gas_resistance: u32,
        #[prost(sint32, tag = "6")]
        pub temperature: i32,
        #[prost(uint32, tag = "7")]
        pub pressure: u32,
        #[prost(uint32, tag = "8")]
        pub humidity: u32,
        #[prost(uint32, tag = "9")]
        pub light: u32,
        #[prost(uint32, tag = "10")]
        pub temperature2: u32,
        #[prost(sint32, repeated, tag = "11")]
        pub gyroscope: ::prost::alloc::vec::Vec<i32>,
        #[prost(sint32, repeated, tag = "12")]
        pub accelerometer: ::prost::alloc::vec::Vec<i32>,
        #[prost(string, tag = "13")]
        pub random: ::prost::alloc::string::String,
    }

    /// Field numbers declared by a message in `sensor.proto`.
    ///
    /// Used by strict decoders that must refuse bytes written for a
    /// different message shape.
    pub trait FieldTags {
        const FIELD_TAGS: &'static [u32];
    }

    impl FieldTags for SensorConfig {
        const FIELD_TAGS: &'static [u32] = &[1, 2, 3, 4, 5, 6, 7, 8];
    }

    impl FieldTags for SensorState {
        const FIELD_TAGS: &'static [u32] = &[1];
    }

    impl FieldTags for SensorData {
        const FIELD_TAGS: &'static [u32] = &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13];
    }
}

// Re-export v1 as the default API version for convenience
pub use v1::*;
