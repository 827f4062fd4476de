use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::WebAuthnError;

/// The ceremony a response belongs to, as named in `clientDataJSON.type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CeremonyType {
    /// Registration, `navigator.credentials.create()`
    #[serde(rename = "webauthn.create")]
    Create,
    /// Authentication, `navigator.credentials.get()`
    #[serde(rename = "webauthn.get")]
    Get,
}

impl CeremonyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "webauthn.create",
            Self::Get => "webauthn.get",
        }
    }
}

impl fmt::Display for CeremonyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CeremonyType {
    type Err = WebAuthnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "webauthn.create" => Ok(Self::Create),
            "webauthn.get" => Ok(Self::Get),
            other => Err(WebAuthnError::UnsupportedType(other.to_string())),
        }
    }
}

/// Token binding state reported by the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBinding {
    /// `supported` or `present`
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Decoded `clientDataJSON`.
///
/// `type_` is kept as received so that an unexpected value can be reported
/// verbatim; [`ClientData::ceremony`] maps it onto [`CeremonyType`].
/// Members not listed here end up in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientData {
    #[serde(rename = "type")]
    pub type_: String,
    /// base64url encoded, as the browser reports it
    pub challenge: String,
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_origin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_binding: Option<TokenBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android_package_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClientData {
    /// Parses the exact bytes of `clientDataJSON`.
    pub fn from_slice(raw: &[u8]) -> Result<Self, WebAuthnError> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| WebAuthnError::Parse(format!("clientDataJSON is not valid UTF-8: {e}")))?;
        serde_json::from_str(text)
            .map_err(|e| WebAuthnError::Parse(format!("Failed to parse clientDataJSON: {e}")))
    }

    pub fn ceremony(&self) -> Result<CeremonyType, WebAuthnError> {
        self.type_.parse()
    }
}
