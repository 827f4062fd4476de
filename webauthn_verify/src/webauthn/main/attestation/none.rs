use crate::webauthn::errors::WebAuthnError;
use crate::webauthn::main::parse::AttestationObject;

use super::utils::stmt_entries;

pub(super) fn verify_none_attestation(attestation: &AttestationObject) -> Result<(), WebAuthnError> {
    if !stmt_entries(&attestation.att_stmt)?.is_empty() {
        return Err(WebAuthnError::Attestation(
            "attStmt must be empty for none attestation".to_string(),
        ));
    }

    Ok(())
}
