use ciborium::value::Value as CborValue;

use crate::webauthn::errors::WebAuthnError;

pub(super) type StmtEntries = [(CborValue, CborValue)];

/// `attStmt` is always a CBOR map once parsed; anything else is rejected here.
pub(super) fn stmt_entries(att_stmt: &CborValue) -> Result<&StmtEntries, WebAuthnError> {
    match att_stmt {
        CborValue::Map(entries) => Ok(entries),
        _ => Err(WebAuthnError::Attestation(
            "attStmt must be a CBOR map".to_string(),
        )),
    }
}

pub(super) fn stmt_get<'a>(entries: &'a StmtEntries, name: &str) -> Option<&'a CborValue> {
    entries.iter().find_map(|(key, value)| match key {
        CborValue::Text(k) if k == name => Some(value),
        _ => None,
    })
}

pub(super) fn get_sig_from_stmt(entries: &StmtEntries) -> Result<(i64, Vec<u8>), WebAuthnError> {
    let alg = match stmt_get(entries, "alg") {
        Some(CborValue::Integer(a)) => i64::try_from(*a).ok(),
        _ => None,
    };
    let sig = match stmt_get(entries, "sig") {
        Some(CborValue::Bytes(s)) => Some(s.clone()),
        _ => None,
    };

    match (alg, sig) {
        (Some(a), Some(s)) => Ok((a, s)),
        _ => Err(WebAuthnError::Attestation(
            "Missing algorithm or signature in attestation statement".to_string(),
        )),
    }
}

/// Reads `x5c` as a list of DER certificates. `None` when the member is absent.
pub(super) fn get_x5c_from_stmt(
    entries: &StmtEntries,
) -> Result<Option<Vec<Vec<u8>>>, WebAuthnError> {
    match stmt_get(entries, "x5c") {
        None => Ok(None),
        Some(CborValue::Array(certs)) => certs
            .iter()
            .map(|cert| match cert {
                CborValue::Bytes(der) => Ok(der.clone()),
                _ => Err(WebAuthnError::Attestation(
                    "x5c entries must be byte strings".to_string(),
                )),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(WebAuthnError::Attestation(
            "x5c must be an array".to_string(),
        )),
    }
}
