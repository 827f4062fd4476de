//! COSE key model (RFC 9052/9053) and its projection onto JWK (RFC 7517).

use std::fmt;

use ciborium::value::Value as CborValue;
use serde::{Deserialize, Serialize};

use super::errors::WebAuthnError;
use crate::utils::base64_encode;

/// COSE key common and type-specific parameter labels
mod labels {
    pub(super) const KTY: i64 = 1;
    pub(super) const ALG: i64 = 3;
    pub(super) const CRV: i64 = -1;
    pub(super) const X: i64 = -2;
    pub(super) const Y: i64 = -3;
    pub(super) const D: i64 = -4;

    pub(super) const RSA_N: i64 = -1;
    pub(super) const RSA_E: i64 = -2;
    pub(super) const RSA_D: i64 = -3;
    pub(super) const RSA_P: i64 = -4;
    pub(super) const RSA_Q: i64 = -5;
}

const KTY_OKP: i64 = 1;
const KTY_EC2: i64 = 2;
const KTY_RSA: i64 = 3;

/// Signature algorithms from the IANA COSE registry that WebAuthn relies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoseAlgorithm {
    #[serde(rename = "ES256")]
    Es256,
    #[serde(rename = "ES384")]
    Es384,
    #[serde(rename = "ES512")]
    Es512,
    #[serde(rename = "EdDSA")]
    EdDsa,
    #[serde(rename = "RS256")]
    Rs256,
    #[serde(rename = "RS384")]
    Rs384,
    #[serde(rename = "RS512")]
    Rs512,
    #[serde(rename = "PS256")]
    Ps256,
    #[serde(rename = "PS384")]
    Ps384,
    #[serde(rename = "PS512")]
    Ps512,
}

impl CoseAlgorithm {
    const ALL: [Self; 10] = [
        Self::Es256,
        Self::Es384,
        Self::Es512,
        Self::EdDsa,
        Self::Rs256,
        Self::Rs384,
        Self::Rs512,
        Self::Ps256,
        Self::Ps384,
        Self::Ps512,
    ];

    pub fn from_i64(value: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.as_i64() == value)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.name() == name)
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Es256 => -7,
            Self::Es384 => -35,
            Self::Es512 => -36,
            Self::EdDsa => -8,
            Self::Rs256 => -257,
            Self::Rs384 => -258,
            Self::Rs512 => -259,
            Self::Ps256 => -37,
            Self::Ps384 => -38,
            Self::Ps512 => -39,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::EdDsa => "EdDSA",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
        }
    }
}

impl fmt::Display for CoseAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Curves from the IANA COSE Elliptic Curves registry, identified by their
/// 1-based index in that registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EllipticCurve {
    P256,
    P384,
    P521,
    X25519,
    X448,
    Ed25519,
    Ed448,
    Secp256k1,
}

impl EllipticCurve {
    const ALL: [Self; 8] = [
        Self::P256,
        Self::P384,
        Self::P521,
        Self::X25519,
        Self::X448,
        Self::Ed25519,
        Self::Ed448,
        Self::Secp256k1,
    ];

    /// Index 0 is reserved and yields `None`.
    pub fn from_index(index: i64) -> Option<Self> {
        let position = usize::try_from(index.checked_sub(1)?).ok()?;
        Self::ALL.get(position).copied()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|crv| crv.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
            Self::X25519 => "X25519",
            Self::X448 => "X448",
            Self::Ed25519 => "Ed25519",
            Self::Ed448 => "Ed448",
            Self::Secp256k1 => "secp256k1",
        }
    }
}

/// Octet key pair (kty 1)
#[derive(Clone, PartialEq, Eq, Default)]
pub struct OkpKey {
    pub alg: Option<i64>,
    pub crv: Option<i64>,
    pub x: Option<Vec<u8>>,
    pub d: Option<Vec<u8>>,
}

/// Elliptic curve key with x and y coordinates (kty 2)
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Ec2Key {
    pub alg: Option<i64>,
    pub crv: Option<i64>,
    pub x: Option<Vec<u8>>,
    pub y: Option<Vec<u8>>,
    pub d: Option<Vec<u8>>,
}

/// RSA key (kty 3)
#[derive(Clone, PartialEq, Eq, Default)]
pub struct RsaKey {
    pub alg: Option<i64>,
    pub n: Option<Vec<u8>>,
    pub e: Option<Vec<u8>>,
    pub d: Option<Vec<u8>>,
    pub p: Option<Vec<u8>>,
    pub q: Option<Vec<u8>>,
}

/// A COSE key as found in `credentialPublicKey`.
///
/// Keys whose `kty` is missing or not one of OKP, EC2 and RSA are kept as
/// [`CoseKey::Other`] rather than rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum CoseKey {
    Okp(OkpKey),
    Ec2(Ec2Key),
    Rsa(RsaKey),
    Other {
        kty: Option<CborValue>,
        alg: Option<i64>,
    },
}

impl CoseKey {
    /// Interprets a decoded CBOR map as a COSE key.
    pub fn from_cbor(value: &CborValue) -> Result<Self, WebAuthnError> {
        let CborValue::Map(entries) = value else {
            return Err(WebAuthnError::Parse(
                "COSE key must be a CBOR map".to_string(),
            ));
        };
        let params = KeyParams { entries };

        let alg = params.int(labels::ALG);
        let key = match params.int(labels::KTY) {
            Some(KTY_OKP) => Self::Okp(OkpKey {
                alg,
                crv: params.int(labels::CRV),
                x: params.bytes(labels::X)?,
                d: params.bytes(labels::D)?,
            }),
            Some(KTY_EC2) => Self::Ec2(Ec2Key {
                alg,
                crv: params.int(labels::CRV),
                x: params.bytes(labels::X)?,
                y: params.bytes(labels::Y)?,
                d: params.bytes(labels::D)?,
            }),
            Some(KTY_RSA) => Self::Rsa(RsaKey {
                alg,
                n: params.bytes(labels::RSA_N)?,
                e: params.bytes(labels::RSA_E)?,
                d: params.bytes(labels::RSA_D)?,
                p: params.bytes(labels::RSA_P)?,
                q: params.bytes(labels::RSA_Q)?,
            }),
            _ => {
                tracing::debug!("COSE key with unrecognized kty, keeping it unprojected");
                Self::Other {
                    kty: params.get(labels::KTY).cloned(),
                    alg,
                }
            }
        };

        Ok(key)
    }

    /// Decodes a single CBOR item and interprets it as a COSE key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, WebAuthnError> {
        let value: CborValue = ciborium::de::from_reader(bytes)
            .map_err(|e| WebAuthnError::Parse(format!("Invalid COSE key CBOR: {e}")))?;
        Self::from_cbor(&value)
    }

    /// Raw value of the `alg` parameter
    pub fn alg(&self) -> Option<i64> {
        match self {
            Self::Okp(k) => k.alg,
            Self::Ec2(k) => k.alg,
            Self::Rsa(k) => k.alg,
            Self::Other { alg, .. } => *alg,
        }
    }

    pub fn algorithm(&self) -> Option<CoseAlgorithm> {
        self.alg().and_then(CoseAlgorithm::from_i64)
    }

    pub fn to_jwk(&self) -> Jwk {
        cose_to_jwk(self)
    }
}

struct KeyParams<'a> {
    entries: &'a [(CborValue, CborValue)],
}

impl KeyParams<'_> {
    fn get(&self, label: i64) -> Option<&CborValue> {
        self.entries.iter().find_map(|(k, v)| match k {
            CborValue::Integer(i) if i64::try_from(*i).ok() == Some(label) => Some(v),
            _ => None,
        })
    }

    fn int(&self, label: i64) -> Option<i64> {
        match self.get(label) {
            Some(CborValue::Integer(i)) => i64::try_from(*i).ok(),
            _ => None,
        }
    }

    fn bytes(&self, label: i64) -> Result<Option<Vec<u8>>, WebAuthnError> {
        match self.get(label) {
            None => Ok(None),
            Some(CborValue::Bytes(b)) => Ok(Some(b.clone())),
            Some(_) => Err(WebAuthnError::Parse(format!(
                "COSE key parameter {label} must be a byte string"
            ))),
        }
    }
}

/// JSON Web Key as produced by [`cose_to_jwk`].
///
/// Byte-valued members hold standard (padded, non URL-safe) base64.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
}

/// Converts a COSE key into its JWK representation.
pub fn cose_to_jwk(cose: &CoseKey) -> Jwk {
    match cose {
        CoseKey::Okp(key) => okp_to_jwk(key),
        CoseKey::Ec2(key) => ec2_to_jwk(key),
        CoseKey::Rsa(key) => rsa_to_jwk(key),
        CoseKey::Other { alg, .. } => Jwk {
            alg: algorithm_name(*alg),
            ..Jwk::default()
        },
    }
}

fn okp_to_jwk(key: &OkpKey) -> Jwk {
    curve_key_jwk("OKP", key.alg, key.crv, &key.x, &key.d)
}

fn ec2_to_jwk(key: &Ec2Key) -> Jwk {
    Jwk {
        y: encode(&key.y),
        ..curve_key_jwk("EC", key.alg, key.crv, &key.x, &key.d)
    }
}

fn rsa_to_jwk(key: &RsaKey) -> Jwk {
    Jwk {
        kty: Some("RSA".to_string()),
        alg: algorithm_name(key.alg),
        n: encode(&key.n),
        e: encode(&key.e),
        d: encode(&key.d),
        p: encode(&key.p),
        q: encode(&key.q),
        ..Jwk::default()
    }
}

/// Members shared by OKP and EC keys
fn curve_key_jwk(
    kty: &str,
    alg: Option<i64>,
    crv: Option<i64>,
    x: &Option<Vec<u8>>,
    d: &Option<Vec<u8>>,
) -> Jwk {
    Jwk {
        kty: Some(kty.to_string()),
        alg: algorithm_name(alg),
        crv: crv
            .and_then(EllipticCurve::from_index)
            .map(|c| c.name().to_string()),
        x: encode(x),
        d: encode(d),
        ..Jwk::default()
    }
}

fn algorithm_name(alg: Option<i64>) -> Option<String> {
    alg.and_then(CoseAlgorithm::from_i64)
        .map(|a| a.name().to_string())
}

fn encode(bytes: &Option<Vec<u8>>) -> Option<String> {
    bytes.as_deref().map(base64_encode)
}

fn redacted<T>(value: &Option<T>) -> Option<&'static str> {
    value.as_ref().map(|_| "<redacted>")
}

impl fmt::Debug for OkpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OkpKey")
            .field("alg", &self.alg)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("d", &redacted(&self.d))
            .finish()
    }
}

impl fmt::Debug for Ec2Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ec2Key")
            .field("alg", &self.alg)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("d", &redacted(&self.d))
            .finish()
    }
}

impl fmt::Debug for RsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKey")
            .field("alg", &self.alg)
            .field("n", &self.n)
            .field("e", &self.e)
            .field("d", &redacted(&self.d))
            .field("p", &redacted(&self.p))
            .field("q", &redacted(&self.q))
            .finish()
    }
}

impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("alg", &self.alg)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("n", &self.n)
            .field("e", &self.e)
            .field("d", &redacted(&self.d))
            .field("p", &redacted(&self.p))
            .field("q", &redacted(&self.q))
            .finish()
    }
}
