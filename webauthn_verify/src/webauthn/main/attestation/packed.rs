use ciborium::value::Value as CborValue;
use webpki::EndEntityCert;

use crate::webauthn::cose::CoseAlgorithm;
use crate::webauthn::errors::WebAuthnError;
use crate::webauthn::main::auth_data::AuthenticatorData;
use crate::webauthn::main::options::PublicKey;
use crate::webauthn::main::signature::verify_signature;

use super::utils::{get_sig_from_stmt, get_x5c_from_stmt, stmt_entries, stmt_get};

/// Verifies a packed attestation statement
///
/// With `x5c` the signature is checked against the attestation certificate.
/// Without it this is self attestation, signed by the credential key itself.
/// ECDAA is not supported. The certificate is not anchored to any root.
pub(super) fn verify_packed_attestation(
    auth_data: &AuthenticatorData,
    raw_auth_data: &[u8],
    client_data_hash: &[u8],
    att_stmt: &CborValue,
) -> Result<(), WebAuthnError> {
    let entries = stmt_entries(att_stmt)?;
    let (alg, sig) = get_sig_from_stmt(entries)?;

    let mut signed_data = Vec::with_capacity(raw_auth_data.len() + client_data_hash.len());
    signed_data.extend_from_slice(raw_auth_data);
    signed_data.extend_from_slice(client_data_hash);

    let x5c = get_x5c_from_stmt(entries)?;
    let ecdaa_key_id = stmt_get(entries, "ecdaaKeyId");

    match (x5c, ecdaa_key_id) {
        (Some(x5c), None) => {
            tracing::debug!("Full attestation with certificate chain");
            let attestn_cert_bytes = x5c.first().ok_or_else(|| {
                WebAuthnError::Attestation("Empty x5c in packed attestation".to_string())
            })?;
            let attestn_cert = EndEntityCert::try_from(attestn_cert_bytes.as_slice())
                .map_err(|e| {
                    WebAuthnError::Attestation(format!(
                        "Failed to parse attestation certificate: {e:?}"
                    ))
                })?;

            attestn_cert
                .verify_signature(webpki_algorithm(alg)?, &signed_data, &sig)
                .map_err(|_| {
                    WebAuthnError::Attestation("Attestation signature invalid".to_string())
                })
        }
        (None, Some(_)) => Err(WebAuthnError::Attestation(
            "ECDAA attestation not supported".to_string(),
        )),
        (None, None) => {
            tracing::debug!("Self attestation");
            verify_self_attestation(auth_data, alg, &signed_data, &sig)
        }
        (Some(_), Some(_)) => Err(WebAuthnError::Attestation(
            "Invalid attestation: both x5c and ecdaaKeyId present".to_string(),
        )),
    }
}

fn verify_self_attestation(
    auth_data: &AuthenticatorData,
    alg: i64,
    signed_data: &[u8],
    signature: &[u8],
) -> Result<(), WebAuthnError> {
    let credential = auth_data.attested_credential_data.as_ref().ok_or_else(|| {
        WebAuthnError::Attestation("No attested credential data in self attestation".to_string())
    })?;

    let key = &credential.credential_public_key;
    if key.alg() != Some(alg) {
        return Err(WebAuthnError::Attestation(format!(
            "Self attestation algorithm {alg} does not match credential key algorithm {:?}",
            key.alg()
        )));
    }

    verify_signature(&PublicKey::Cose(key.clone()), signed_data, signature).map_err(|e| {
        WebAuthnError::Attestation(format!(
            "Self attestation signature verification failed: {e}"
        ))
    })
}

fn webpki_algorithm(alg: i64) -> Result<&'static webpki::SignatureAlgorithm, WebAuthnError> {
    match CoseAlgorithm::from_i64(alg) {
        Some(CoseAlgorithm::Es256) => Ok(&webpki::ECDSA_P256_SHA256),
        Some(CoseAlgorithm::Es384) => Ok(&webpki::ECDSA_P384_SHA384),
        Some(CoseAlgorithm::EdDsa) => Ok(&webpki::ED25519),
        Some(CoseAlgorithm::Rs256) => Ok(&webpki::RSA_PKCS1_2048_8192_SHA256),
        Some(CoseAlgorithm::Rs384) => Ok(&webpki::RSA_PKCS1_2048_8192_SHA384),
        Some(CoseAlgorithm::Rs512) => Ok(&webpki::RSA_PKCS1_2048_8192_SHA512),
        Some(CoseAlgorithm::Ps256) => Ok(&webpki::RSA_PSS_2048_8192_SHA256_LEGACY_KEY),
        Some(CoseAlgorithm::Ps384) => Ok(&webpki::RSA_PSS_2048_8192_SHA384_LEGACY_KEY),
        Some(CoseAlgorithm::Ps512) => Ok(&webpki::RSA_PSS_2048_8192_SHA512_LEGACY_KEY),
        _ => Err(WebAuthnError::Attestation(format!(
            "Unsupported or unrecognized algorithm: {alg}"
        ))),
    }
}
