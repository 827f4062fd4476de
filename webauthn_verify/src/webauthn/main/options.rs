use serde::{Deserialize, Deserializer, de};
use serde_json::Value;

use crate::config::{ADDITIONAL_ORIGINS, ORIGIN, PASSKEY_RP_ID};
use crate::utils::BinaryData;
use crate::webauthn::cose::{CoseAlgorithm, CoseKey, Jwk};
use crate::webauthn::errors::WebAuthnError;
use crate::webauthn::types::CeremonyType;

/// A single user factor the authenticator must attest to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserFactorRequirement {
    /// UV flag
    Verified,
    /// UP flag
    Present,
}

/// User presence/verification policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserFactor {
    /// At least one of UV and UP must be set
    Either,
    /// Every listed flag must be set. An empty list is a configuration error.
    All(Vec<UserFactorRequirement>),
}

impl<'de> Deserialize<'de> for UserFactor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) if s == "either" => Ok(Self::Either),
            Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).map_err(de::Error::custom))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::All),
            other => Err(de::Error::custom(format!(
                "'userFactor' must be an array or the string 'either', got {other}"
            ))),
        }
    }
}

/// Public key material as a verifier-ready key handle would take it.
///
/// `key` holds what `ring` expects for the algorithm: an uncompressed SEC1
/// point for ECDSA, the 32 raw bytes for Ed25519, or a DER `RSAPublicKey`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RawPublicKey {
    pub algorithm: CoseAlgorithm,
    pub key: BinaryData,
}

/// The credential public key to check assertion signatures against.
#[derive(Clone, Debug, PartialEq)]
pub enum PublicKey {
    Cose(CoseKey),
    Jwk(Jwk),
    Raw(RawPublicKey),
}

impl From<CoseKey> for PublicKey {
    fn from(key: CoseKey) -> Self {
        Self::Cose(key)
    }
}

impl From<Jwk> for PublicKey {
    fn from(key: Jwk) -> Self {
        Self::Jwk(key)
    }
}

impl From<RawPublicKey> for PublicKey {
    fn from(key: RawPublicKey) -> Self {
        Self::Raw(key)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.get("kty").is_some() {
            serde_json::from_value(value)
                .map(Self::Jwk)
                .map_err(de::Error::custom)
        } else if value.get("algorithm").is_some() {
            serde_json::from_value(value)
                .map(Self::Raw)
                .map_err(de::Error::custom)
        } else {
            Err(de::Error::custom(
                "'publicKey' must be a JWK or an {algorithm, key} object",
            ))
        }
    }
}

/// Caller policy for [`verify`](super::verify::verify).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOptions {
    /// Expected `clientData.type`
    #[serde(rename = "type")]
    pub type_: CeremonyType,
    /// The challenge issued for this ceremony
    pub challenge: BinaryData,
    /// Origins `clientData.origin` may take
    pub origins: Vec<String>,
    /// Credential public key; assertions only
    #[serde(default)]
    pub public_key: Option<PublicKey>,
    /// Stored signature counter from the previous ceremony
    #[serde(default)]
    pub counter: Option<u32>,
    #[serde(default)]
    pub user_factor: Option<UserFactor>,
    /// Expected user handle; assertions only
    #[serde(default)]
    pub user_handle: Option<BinaryData>,
    /// Relying party id whose SHA-256 must match `rpIdHash`
    #[serde(default)]
    pub rp_id: Option<String>,
}

impl VerifyOptions {
    pub fn new<I, S>(type_: CeremonyType, challenge: impl Into<BinaryData>, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_,
            challenge: challenge.into(),
            origins: origins.into_iter().map(Into::into).collect(),
            public_key: None,
            counter: None,
            user_factor: None,
            user_handle: None,
            rp_id: None,
        }
    }

    /// Builds options from `ORIGIN`, `WEBAUTHN_ADDITIONAL_ORIGINS` and `PASSKEY_RP_ID`.
    pub fn from_env(
        type_: CeremonyType,
        challenge: impl Into<BinaryData>,
    ) -> Result<Self, WebAuthnError> {
        let origin = ORIGIN
            .as_deref()
            .ok_or_else(|| WebAuthnError::Config("ORIGIN must be set".to_string()))?;

        let mut origins = vec![origin.to_string()];
        origins.extend(ADDITIONAL_ORIGINS.iter().cloned());

        let mut options = Self::new(type_, challenge, origins);
        options.rp_id = PASSKEY_RP_ID.clone();
        Ok(options)
    }

    pub fn with_public_key(mut self, key: impl Into<PublicKey>) -> Self {
        self.public_key = Some(key.into());
        self
    }

    pub fn with_counter(mut self, counter: u32) -> Self {
        self.counter = Some(counter);
        self
    }

    pub fn with_user_factor(mut self, user_factor: UserFactor) -> Self {
        self.user_factor = Some(user_factor);
        self
    }

    pub fn with_user_handle(mut self, user_handle: impl Into<BinaryData>) -> Self {
        self.user_handle = Some(user_handle.into());
        self
    }

    pub fn with_rp_id(mut self, rp_id: impl Into<String>) -> Self {
        self.rp_id = Some(rp_id.into());
        self
    }
}
