use ciborium::value::Value as CborValue;
use webpki::EndEntityCert;

use crate::webauthn::cose::{CoseKey, Ec2Key};
use crate::webauthn::errors::WebAuthnError;
use crate::webauthn::main::auth_data::AuthenticatorData;

use super::utils::{get_x5c_from_stmt, stmt_entries, stmt_get};

/// Verifies a FIDO-U2F attestation statement
///
/// The certificate signs the legacy U2F registration payload:
/// `0x00 || rpIdHash || clientDataHash || credentialId || 0x04 || x || y`.
pub(super) fn verify_u2f_attestation(
    auth_data: &AuthenticatorData,
    client_data_hash: &[u8],
    att_stmt: &CborValue,
) -> Result<(), WebAuthnError> {
    tracing::debug!("Verifying FIDO-U2F attestation");

    let entries = stmt_entries(att_stmt)?;
    let sig = match stmt_get(entries, "sig") {
        Some(CborValue::Bytes(s)) => s,
        _ => {
            return Err(WebAuthnError::Attestation(
                "Missing signature in FIDO-U2F attestation".to_string(),
            ));
        }
    };
    let x5c = get_x5c_from_stmt(entries)?.ok_or_else(|| {
        WebAuthnError::Attestation("Missing x5c in FIDO-U2F attestation".to_string())
    })?;
    let [attestn_cert_bytes] = x5c.as_slice() else {
        return Err(WebAuthnError::Attestation(format!(
            "FIDO-U2F attestation requires exactly one certificate, got {}",
            x5c.len()
        )));
    };

    let credential = auth_data.attested_credential_data.as_ref().ok_or_else(|| {
        WebAuthnError::Attestation("No attested credential data in FIDO-U2F attestation".to_string())
    })?;
    let (x_coord, y_coord) = match &credential.credential_public_key {
        CoseKey::Ec2(Ec2Key {
            x: Some(x),
            y: Some(y),
            ..
        }) if x.len() == 32 && y.len() == 32 => (x, y),
        _ => {
            return Err(WebAuthnError::Attestation(
                "FIDO-U2F credential key must be an uncompressed P-256 key".to_string(),
            ));
        }
    };

    let mut verification_data = Vec::with_capacity(1 + 32 + 32 + credential.credential_id.len() + 65);
    verification_data.push(0x00);
    verification_data.extend_from_slice(&auth_data.rp_id_hash);
    verification_data.extend_from_slice(client_data_hash);
    verification_data.extend_from_slice(&credential.credential_id);
    verification_data.push(0x04);
    verification_data.extend_from_slice(x_coord);
    verification_data.extend_from_slice(y_coord);

    let attestn_cert = EndEntityCert::try_from(attestn_cert_bytes.as_slice()).map_err(|e| {
        WebAuthnError::Attestation(format!(
            "Failed to parse U2F attestation certificate: {e:?}"
        ))
    })?;

    attestn_cert
        .verify_signature(&webpki::ECDSA_P256_SHA256, &verification_data, sig)
        .map_err(|_| WebAuthnError::Attestation("U2F attestation signature invalid".to_string()))?;

    tracing::debug!("FIDO-U2F attestation verification successful");
    Ok(())
}
