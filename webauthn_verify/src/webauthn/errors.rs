use thiserror::Error;

use crate::utils::UtilError;

/// Errors that can occur while parsing or verifying a WebAuthn response.
///
/// Every variant is a rejection of the response as a whole. Variants carry
/// a human readable description including the received and expected values
/// where that helps diagnosis; private key material is never included.
#[derive(Debug, Error)]
pub enum WebAuthnError {
    /// Byte coercion failed (invalid base64 or unsupported input shape)
    #[error(transparent)]
    Format(#[from] UtilError),

    /// Malformed binary, CBOR or JSON input
    #[error("Parse error: {0}")]
    Parse(String),

    /// Client data type other than `webauthn.create` or `webauthn.get`
    #[error("Unsupported clientData type: {0}")]
    UnsupportedType(String),

    /// The caller supplied malformed verification options
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Origin {0} not allowed")]
    OriginMismatch(String),

    #[error("Challenge mismatch, got: {got}, expected: {expected}")]
    ChallengeMismatch { got: String, expected: String },

    #[error("Counter error: {0}")]
    Counter(CounterViolation),

    #[error("User factor error: {0}")]
    UserFactor(String),

    #[error("Unexpected client data type, got: {got}, expected: {expected}")]
    TypeMismatch { got: String, expected: String },

    #[error("User handle mismatch: {0}")]
    UserHandleMismatch(String),

    /// Signature missing, malformed, or rejected by the primitive
    #[error("Signature error: {0}")]
    Signature(String),

    /// Attestation statement rejected for its format
    #[error("Attestation error: {0}")]
    Attestation(String),

    #[error("'rpId' hash doesn't match, got: {got}, expected: {expected}")]
    RpIdMismatch { got: String, expected: String },
}

/// Ways in which a new signature counter can disagree with the stored baseline.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CounterViolation {
    #[error("'signCount' lower than provided, got: {got}, expected: {expected}")]
    Rollback { got: u32, expected: u32 },

    #[error("'signCount' equal to provided ({0})")]
    Replay(u32),

    #[error("'signCount' higher than provided+1, got: {got}, expected: {expected}")]
    Gap { got: u32, expected: u64 },
}

impl From<serde_json::Error> for WebAuthnError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(format!("Invalid JSON: {e}"))
    }
}
