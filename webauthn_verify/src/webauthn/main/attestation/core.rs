use ring::digest;

use crate::webauthn::errors::WebAuthnError;
use crate::webauthn::main::parse::AttestationObject;

use super::none::verify_none_attestation;
use super::packed::verify_packed_attestation;
use super::u2f::verify_u2f_attestation;

/// Checks the attestation statement of a registration for its format.
///
/// `raw_auth_data` and `client_data` are the bytes exactly as received.
pub(crate) fn verify_attestation(
    attestation: &AttestationObject,
    raw_auth_data: &[u8],
    client_data: &[u8],
) -> Result<(), WebAuthnError> {
    let client_data_hash = digest::digest(&digest::SHA256, client_data);

    match attestation.fmt.as_str() {
        "none" => {
            // for platform authenticators
            tracing::debug!("Using 'none' attestation format");
            verify_none_attestation(attestation)
        }
        "packed" => {
            // for security keys
            tracing::debug!("Using 'packed' attestation format");
            verify_packed_attestation(
                &attestation.auth_data,
                raw_auth_data,
                client_data_hash.as_ref(),
                &attestation.att_stmt,
            )
        }
        "fido-u2f" => {
            tracing::debug!("Using 'fido-u2f' attestation format");
            verify_u2f_attestation(
                &attestation.auth_data,
                client_data_hash.as_ref(),
                &attestation.att_stmt,
            )
        }
        fmt @ ("tpm" | "android-key" | "android-safetynet" | "apple") => {
            tracing::warn!("Attestation format '{fmt}' accepted without verification");
            Ok(())
        }
        other => Err(WebAuthnError::Attestation(format!(
            "Unsupported attestation format: {other}"
        ))),
    }
}
