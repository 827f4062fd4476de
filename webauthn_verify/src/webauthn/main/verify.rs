use ring::digest;
use subtle::ConstantTimeEq;

use super::attestation::verify_attestation;
use super::auth_data::AuthenticatorData;
use super::options::{UserFactor, UserFactorRequirement, VerifyOptions};
use super::parse::{ParsedResponse, ResponseBody};
use super::signature::verify_signature;
use crate::utils::{BinaryData, base64_encode};
use crate::webauthn::errors::{CounterViolation, WebAuthnError};
use crate::webauthn::types::ClientData;

/// Runs every trust check on a parsed response against the caller's policy.
///
/// Checks run in a fixed order and the first failure is returned:
/// origin, challenge, counter, user factor, ceremony type, then either the
/// assertion checks (user handle, signature) or the attestation statement,
/// and finally the RP id hash.
///
/// A stored counter of `0` means the authenticator has no counter, so the
/// counter check is skipped. Attestation formats other than `none`, `packed`,
/// `fido-u2f`, `tpm`, `android-key`, `android-safetynet` and `apple` are
/// rejected rather than passed through.
pub fn verify(response: &ParsedResponse, options: &VerifyOptions) -> Result<(), WebAuthnError> {
    let client_data = response.client_data();
    let auth_data = response.authenticator_data();

    verify_origin(client_data, &options.origins)?;
    verify_challenge(client_data, &options.challenge)?;

    if let Some(counter) = options.counter.filter(|&counter| counter != 0) {
        verify_counter(auth_data, counter)?;
    }

    if let Some(user_factor) = &options.user_factor {
        verify_user_factor(auth_data, user_factor)?;
    }

    if client_data.type_ != options.type_.as_str() {
        tracing::error!(
            "Client data type mismatch: {} != {}",
            client_data.type_,
            options.type_
        );
        return Err(WebAuthnError::TypeMismatch {
            got: client_data.type_.clone(),
            expected: options.type_.to_string(),
        });
    }

    match &response.response.body {
        ResponseBody::Assertion(_) => {
            if let Some(expected) = &options.user_handle {
                verify_user_handle(response.response.user_handle.as_ref(), expected)?;
            }
            if let Some(public_key) = &options.public_key {
                let signature = response.response.signature.as_ref().ok_or_else(|| {
                    tracing::error!("Assertion has no signature");
                    WebAuthnError::Signature("Missing 'signature'".to_string())
                })?;
                let signature = signature.to_bytes("response.signature")?;

                let client_data_hash = digest::digest(&digest::SHA256, response.raw_client_data());
                let mut signed_data = response.raw_authenticator_data().to_vec();
                signed_data.extend_from_slice(client_data_hash.as_ref());

                tracing::debug!("Signed data length: {}", signed_data.len());
                verify_signature(public_key, &signed_data, &signature).inspect_err(|e| {
                    tracing::error!("Signature verification failed: {e}");
                })?;
            }
        }
        ResponseBody::Attestation(attestation) => {
            verify_attestation(
                attestation,
                response.raw_authenticator_data(),
                response.raw_client_data(),
            )
            .inspect_err(|e| tracing::error!("Attestation verification failed: {e}"))?;
        }
    }

    if let Some(rp_id) = &options.rp_id {
        verify_rp_id_hash(auth_data, rp_id)?;
    }

    tracing::debug!("WebAuthn response verified");
    Ok(())
}

fn verify_origin(client_data: &ClientData, origins: &[String]) -> Result<(), WebAuthnError> {
    if origins.is_empty() {
        tracing::error!("No allowed origins configured");
        return Err(WebAuthnError::Config(
            "'origins' must be a non-empty list".to_string(),
        ));
    }

    if !origins.iter().any(|o| *o == client_data.origin) {
        tracing::error!(
            "Origin {} not in allowed origins {:?}",
            client_data.origin,
            origins
        );
        return Err(WebAuthnError::OriginMismatch(client_data.origin.clone()));
    }

    Ok(())
}

fn verify_challenge(client_data: &ClientData, expected: &BinaryData) -> Result<(), WebAuthnError> {
    let expected_bytes = expected.to_bytes("options.challenge")?;
    // Undecodable text cannot match any challenge
    let matches = BinaryData::Base64(client_data.challenge.clone())
        .to_bytes("clientData.challenge")
        .is_ok_and(|got_bytes| bool::from(got_bytes.ct_eq(&expected_bytes)));

    if !matches {
        tracing::error!("Challenge mismatch");
        return Err(WebAuthnError::ChallengeMismatch {
            got: client_data.challenge.clone(),
            expected: base64_encode(&expected_bytes),
        });
    }

    Ok(())
}

/// Accepts only `signCount == counter + 1`.
fn verify_counter(auth_data: &AuthenticatorData, counter: u32) -> Result<(), WebAuthnError> {
    let got = auth_data.sign_count;
    let expected = u64::from(counter) + 1;

    tracing::debug!("Counter check: stored={counter}, received={got}");

    let violation = if got < counter {
        CounterViolation::Rollback {
            got,
            expected: counter,
        }
    } else if got == counter {
        CounterViolation::Replay(got)
    } else if u64::from(got) > expected {
        CounterViolation::Gap { got, expected }
    } else {
        return Ok(());
    };

    tracing::error!("Counter check failed: {violation}");
    Err(WebAuthnError::Counter(violation))
}

fn verify_user_factor(
    auth_data: &AuthenticatorData,
    user_factor: &UserFactor,
) -> Result<(), WebAuthnError> {
    let (uv, up) = (auth_data.flags.uv, auth_data.flags.up);

    match user_factor {
        UserFactor::Either => {
            if !(uv || up) {
                tracing::error!("Neither user verified nor user present flag set");
                return Err(WebAuthnError::UserFactor(
                    "neither 'uv' nor 'up' flag is set".to_string(),
                ));
            }
        }
        UserFactor::All(requirements) => {
            if requirements.is_empty() {
                return Err(WebAuthnError::Config(
                    "'userFactor' must not be an empty list".to_string(),
                ));
            }
            if requirements.contains(&UserFactorRequirement::Verified) && !uv {
                tracing::error!("User verification required but flag not set");
                return Err(WebAuthnError::UserFactor(
                    "'verified' required but 'uv' flag is not set".to_string(),
                ));
            }
            if requirements.contains(&UserFactorRequirement::Present) && !up {
                tracing::error!("User presence required but flag not set");
                return Err(WebAuthnError::UserFactor(
                    "'present' required but 'up' flag is not set".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn verify_user_handle(
    received: Option<&BinaryData>,
    expected: &BinaryData,
) -> Result<(), WebAuthnError> {
    let Some(received) = received else {
        tracing::error!("Expected a user handle but the response carries none");
        return Err(WebAuthnError::UserHandleMismatch(
            "response has no 'userHandle'".to_string(),
        ));
    };

    let received = received.to_bytes("response.userHandle")?;
    let expected = expected.to_bytes("options.userHandle")?;

    if !bool::from(received.ct_eq(&expected)) {
        tracing::error!("User handle mismatch");
        return Err(WebAuthnError::UserHandleMismatch(format!(
            "got: {}, expected: {}",
            base64_encode(&received),
            base64_encode(&expected)
        )));
    }

    tracing::debug!("User handle verified successfully");
    Ok(())
}

fn verify_rp_id_hash(auth_data: &AuthenticatorData, rp_id: &str) -> Result<(), WebAuthnError> {
    let expected = digest::digest(&digest::SHA256, rp_id.as_bytes());

    if !bool::from(auth_data.rp_id_hash[..].ct_eq(expected.as_ref())) {
        tracing::error!("RP ID hash mismatch for '{rp_id}'");
        return Err(WebAuthnError::RpIdMismatch {
            got: base64_encode(&auth_data.rp_id_hash),
            expected: base64_encode(expected.as_ref()),
        });
    }

    Ok(())
}
