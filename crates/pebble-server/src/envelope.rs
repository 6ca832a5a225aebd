//! Binary envelope decoding.
//!
//! A payload is a `BinPackage` whose `type` selects exactly one of the
//! config, state or data sub-messages carried in `data`. Sub-messages are
//! decoded strictly: every field number must belong to the selected shape,
//! so bytes written for one shape are not accepted under another type.

use pebble_proto::bin_package::PackageType;
use pebble_proto::{BinPackage, FieldTags, SensorConfig, SensorData, SensorState};
use prost::Message;
use prost::encoding::{WireType, decode_key, decode_varint};

/// Envelope decoding failures. Both are client errors.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown envelope type {0}")]
    UnknownEnvelopeType(i32),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Outer envelope fields that travel alongside the sub-message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Device clock, epoch seconds.
    pub timestamp: u32,
    pub signature: Vec<u8>,
    pub package_type: PackageType,
}

/// The decoded sub-message.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorMessage {
    Config(SensorConfig),
    State(SensorState),
    Data(SensorData),
}

impl SensorMessage {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::State(_) => "state",
            Self::Data(_) => "data",
        }
    }
}

/// Decode a raw payload into its envelope and typed sub-message.
pub fn decode(raw: &[u8]) -> Result<(Envelope, SensorMessage), DecodeError> {
    let package = BinPackage::decode(raw)
        .map_err(|e| DecodeError::MalformedPayload(format!("envelope: {e}")))?;

    let package_type = PackageType::try_from(package.r#type)
        .map_err(|_| DecodeError::UnknownEnvelopeType(package.r#type))?;

    let message = match package_type {
        PackageType::Config => SensorMessage::Config(decode_strict(&package.data)?),
        PackageType::State => SensorMessage::State(decode_strict(&package.data)?),
        PackageType::Data => SensorMessage::Data(decode_strict(&package.data)?),
    };

    let envelope = Envelope {
        timestamp: package.timestamp,
        signature: package.signature,
        package_type,
    };
    Ok((envelope, message))
}

fn decode_strict<M>(bytes: &[u8]) -> Result<M, DecodeError>
where
    M: Message + Default + FieldTags,
{
    check_field_tags::<M>(bytes)?;
    M::decode(bytes).map_err(|e| DecodeError::MalformedPayload(e.to_string()))
}

/// Walk the top-level fields of `bytes` and reject any field number `M`
/// does not declare.
fn check_field_tags<M: FieldTags>(mut buf: &[u8]) -> Result<(), DecodeError> {
    let malformed = |e: prost::DecodeError| DecodeError::MalformedPayload(e.to_string());

    while !buf.is_empty() {
        let (tag, wire_type) = decode_key(&mut buf).map_err(malformed)?;
        if !M::FIELD_TAGS.contains(&tag) {
            return Err(DecodeError::MalformedPayload(format!(
                "field {tag} is not part of the selected message"
            )));
        }
        let skip = match wire_type {
            WireType::Varint => {
                decode_varint(&mut buf).map_err(malformed)?;
                0
            }
            WireType::SixtyFourBit => 8,
            WireType::ThirtyTwoBit => 4,
            WireType::LengthDelimited => {
                let len = decode_varint(&mut buf).map_err(malformed)?;
                usize::try_from(len).map_err(|_| {
                    DecodeError::MalformedPayload(format!("field {tag} length overflow"))
                })?
            }
            WireType::StartGroup | WireType::EndGroup => {
                return Err(DecodeError::MalformedPayload(format!(
                    "field {tag} uses a group encoding"
                )));
            }
        };
        if buf.len() < skip {
            return Err(DecodeError::MalformedPayload(format!("field {tag} is truncated")));
        }
        buf = &buf[skip..];
    }
    Ok(())
}
