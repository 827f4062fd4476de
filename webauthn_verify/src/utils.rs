use base64::{
    Engine as _, alphabet,
    engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD},
    engine::DecodePaddingMode,
};
use serde::{Deserialize, Deserializer, de};
use serde_json::Value;
use thiserror::Error;

/// Standard-alphabet engine that accepts input with or without padding.
///
/// URL-safe input is mapped onto the standard alphabet before decoding, so this
/// one engine covers both `clientDataJSON` as emitted by browsers (base64url,
/// unpadded) and values stored by relying parties (standard, padded).
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UtilError {
    #[error("Invalid format: {0}")]
    Format(String),
}

/// Binary input that is either still base64 text or already raw bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BinaryData {
    Base64(String),
    Bytes(Vec<u8>),
}

impl BinaryData {
    /// Reads a byte-like JSON value.
    ///
    /// Accepts a base64 string, an array of byte values, or a Node.js style
    /// `{"type":"Buffer","data":[..]}` object. `name` is used in the error message.
    pub fn from_json(value: &Value, name: &str) -> Result<Self, UtilError> {
        match value {
            Value::String(s) => Ok(Self::Base64(s.clone())),
            Value::Array(items) => bytes_from_array(items, name).map(Self::Bytes),
            Value::Object(map) => match (map.get("type"), map.get("data")) {
                (Some(Value::String(t)), Some(Value::Array(items))) if t == "Buffer" => {
                    bytes_from_array(items, name).map(Self::Bytes)
                }
                _ => Err(unsupported(name)),
            },
            _ => Err(unsupported(name)),
        }
    }

    pub fn to_bytes(&self, name: &str) -> Result<Vec<u8>, UtilError> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Base64(text) => base64_decode(text).map_err(|_| unsupported(name)),
        }
    }
}

impl From<&str> for BinaryData {
    fn from(value: &str) -> Self {
        Self::Base64(value.to_string())
    }
}

impl From<String> for BinaryData {
    fn from(value: String) -> Self {
        Self::Base64(value)
    }
}

impl From<Vec<u8>> for BinaryData {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for BinaryData {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for BinaryData {
    fn from(value: [u8; N]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl<'de> Deserialize<'de> for BinaryData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value, "value").map_err(de::Error::custom)
    }
}

/// Coerces base64 text or raw bytes into an exact byte sequence.
pub fn to_buffer(value: impl Into<BinaryData>) -> Result<Vec<u8>, UtilError> {
    value.into().to_bytes("value")
}

/// Decodes base64 in either alphabet, padded or not.
pub(crate) fn base64_decode(input: &str) -> Result<Vec<u8>, UtilError> {
    let normalized: String = input
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    LENIENT
        .decode(normalized)
        .map_err(|e| UtilError::Format(format!("Failed to decode base64: {e}")))
}

/// Encodes with the standard, padded alphabet.
pub(crate) fn base64_encode(input: &[u8]) -> String {
    STANDARD.encode(input)
}

fn bytes_from_array(items: &[Value], name: &str) -> Result<Vec<u8>, UtilError> {
    items
        .iter()
        .map(|item| {
            item.as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| unsupported(name))
        })
        .collect()
}

fn unsupported(name: &str) -> UtilError {
    UtilError::Format(format!(
        "'{name}' must be either a byte array or a base64-encoded string"
    ))
}
