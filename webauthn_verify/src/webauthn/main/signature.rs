use ring::signature::{self, RsaParameters, UnparsedPublicKey, VerificationAlgorithm};

use super::options::{PublicKey, RawPublicKey};
use crate::utils::base64_decode;
use crate::webauthn::cose::{CoseAlgorithm, EllipticCurve, Jwk, cose_to_jwk};
use crate::webauthn::errors::WebAuthnError;

/// A public key resolved to a concrete `ring` verification algorithm.
enum KeyHandle {
    Unparsed {
        algorithm: &'static dyn VerificationAlgorithm,
        bytes: Vec<u8>,
    },
    Rsa {
        parameters: &'static RsaParameters,
        n: Vec<u8>,
        e: Vec<u8>,
    },
}

impl KeyHandle {
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            Self::Unparsed { algorithm, bytes } => UnparsedPublicKey::new(*algorithm, bytes)
                .verify(message, signature)
                .is_ok(),
            Self::Rsa { parameters, n, e } => signature::RsaPublicKeyComponents { n, e }
                .verify(parameters, message, signature)
                .is_ok(),
        }
    }
}

/// Checks `signature` over `message` with `key`.
///
/// COSE keys go through their JWK projection; the algorithm is inferred from
/// key type and curve, refined by `alg` where the key carries one.
pub(crate) fn verify_signature(
    key: &PublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), WebAuthnError> {
    let handle = match key {
        PublicKey::Cose(cose) => jwk_handle(&cose_to_jwk(cose))?,
        PublicKey::Jwk(jwk) => jwk_handle(jwk)?,
        PublicKey::Raw(raw) => raw_handle(raw)?,
    };

    if handle.verify(message, signature) {
        Ok(())
    } else {
        Err(WebAuthnError::Signature(
            "Signature verification failed".to_string(),
        ))
    }
}

fn jwk_handle(jwk: &Jwk) -> Result<KeyHandle, WebAuthnError> {
    let alg = match jwk.alg.as_deref() {
        None => None,
        Some(name) => Some(
            CoseAlgorithm::from_name(name)
                .ok_or_else(|| unsupported(format!("JWK algorithm {name}")))?,
        ),
    };
    let crv = jwk.crv.as_deref().and_then(EllipticCurve::from_name);

    match jwk.kty.as_deref() {
        Some("EC") => {
            let algorithm: &'static dyn VerificationAlgorithm = match (crv, alg) {
                (Some(EllipticCurve::P256), None | Some(CoseAlgorithm::Es256)) => {
                    &signature::ECDSA_P256_SHA256_ASN1
                }
                (Some(EllipticCurve::P256), Some(CoseAlgorithm::Es384)) => {
                    &signature::ECDSA_P256_SHA384_ASN1
                }
                (Some(EllipticCurve::P384), None | Some(CoseAlgorithm::Es384)) => {
                    &signature::ECDSA_P384_SHA384_ASN1
                }
                (Some(EllipticCurve::P384), Some(CoseAlgorithm::Es256)) => {
                    &signature::ECDSA_P384_SHA256_ASN1
                }
                _ => return Err(unsupported(format!("EC key {:?}/{:?}", jwk.crv, jwk.alg))),
            };
            let mut point = vec![0x04];
            point.extend(member(&jwk.x, "x")?);
            point.extend(member(&jwk.y, "y")?);
            Ok(KeyHandle::Unparsed {
                algorithm,
                bytes: point,
            })
        }
        Some("OKP") => match (crv, alg) {
            (Some(EllipticCurve::Ed25519), None | Some(CoseAlgorithm::EdDsa)) => {
                Ok(KeyHandle::Unparsed {
                    algorithm: &signature::ED25519,
                    bytes: member(&jwk.x, "x")?,
                })
            }
            _ => Err(unsupported(format!("OKP key {:?}/{:?}", jwk.crv, jwk.alg))),
        },
        Some("RSA") => {
            let parameters = rsa_parameters(alg.unwrap_or(CoseAlgorithm::Rs256))?;
            Ok(KeyHandle::Rsa {
                parameters,
                n: strip_leading_zeros(member(&jwk.n, "n")?),
                e: strip_leading_zeros(member(&jwk.e, "e")?),
            })
        }
        other => Err(unsupported(format!("key type {other:?}"))),
    }
}

fn raw_handle(raw: &RawPublicKey) -> Result<KeyHandle, WebAuthnError> {
    let algorithm: &'static dyn VerificationAlgorithm = match raw.algorithm {
        CoseAlgorithm::Es256 => &signature::ECDSA_P256_SHA256_ASN1,
        CoseAlgorithm::Es384 => &signature::ECDSA_P384_SHA384_ASN1,
        CoseAlgorithm::EdDsa => &signature::ED25519,
        rsa @ (CoseAlgorithm::Rs256
        | CoseAlgorithm::Rs384
        | CoseAlgorithm::Rs512
        | CoseAlgorithm::Ps256
        | CoseAlgorithm::Ps384
        | CoseAlgorithm::Ps512) => rsa_parameters(rsa)?,
        CoseAlgorithm::Es512 => return Err(unsupported("algorithm ES512".to_string())),
    };

    Ok(KeyHandle::Unparsed {
        algorithm,
        bytes: raw.key.to_bytes("options.publicKey.key")?,
    })
}

fn rsa_parameters(alg: CoseAlgorithm) -> Result<&'static RsaParameters, WebAuthnError> {
    match alg {
        CoseAlgorithm::Rs256 => Ok(&signature::RSA_PKCS1_2048_8192_SHA256),
        CoseAlgorithm::Rs384 => Ok(&signature::RSA_PKCS1_2048_8192_SHA384),
        CoseAlgorithm::Rs512 => Ok(&signature::RSA_PKCS1_2048_8192_SHA512),
        CoseAlgorithm::Ps256 => Ok(&signature::RSA_PSS_2048_8192_SHA256),
        CoseAlgorithm::Ps384 => Ok(&signature::RSA_PSS_2048_8192_SHA384),
        CoseAlgorithm::Ps512 => Ok(&signature::RSA_PSS_2048_8192_SHA512),
        other => Err(unsupported(format!("RSA key with algorithm {other}"))),
    }
}

fn member(value: &Option<String>, name: &str) -> Result<Vec<u8>, WebAuthnError> {
    let text = value
        .as_deref()
        .ok_or_else(|| WebAuthnError::Signature(format!("Public key is missing '{name}'")))?;
    base64_decode(text)
        .map_err(|_| WebAuthnError::Signature(format!("Public key member '{name}' is not base64")))
}

fn strip_leading_zeros(mut bytes: Vec<u8>) -> Vec<u8> {
    let zeros = bytes.iter().take_while(|b| **b == 0).count();
    bytes.drain(..zeros);
    bytes
}

fn unsupported(what: String) -> WebAuthnError {
    WebAuthnError::Signature(format!("Unsupported public key: {what}"))
}
