use ciborium::value::Value as CborValue;
use serde_json::{Map, Value};

use super::auth_data::{AuthenticatorData, parse_authenticator_data};
use crate::utils::BinaryData;
use crate::webauthn::cose::{Jwk, cose_to_jwk};
use crate::webauthn::errors::WebAuthnError;
use crate::webauthn::types::{CeremonyType, ClientData};

/// What [`parse`] accepts: an already decoded JSON object, or JSON text/bytes.
#[derive(Clone, Debug)]
pub enum ResponseInput {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<Value> for ResponseInput {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<&str> for ResponseInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ResponseInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&[u8]> for ResponseInput {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for ResponseInput {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Decoded `attestationObject`
#[derive(Clone, Debug, PartialEq)]
pub struct AttestationObject {
    pub fmt: String,
    /// Format specific statement, always a CBOR map
    pub att_stmt: CborValue,
    pub auth_data: AuthenticatorData,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    /// `webauthn.create`
    Attestation(AttestationObject),
    /// `webauthn.get`
    Assertion(AuthenticatorData),
}

/// The `response` member of a credential, decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthenticatorResponse {
    pub client_data: ClientData,
    pub body: ResponseBody,
    pub signature: Option<BinaryData>,
    pub user_handle: Option<BinaryData>,
    pub transports: Option<Vec<String>>,
    /// Members not recognized above, kept verbatim
    pub extra: Map<String, Value>,
}

/// A parsed registration or authentication response.
///
/// The exact bytes that were signed over are captured once at parse time and
/// exposed through [`raw_client_data`](Self::raw_client_data) and
/// [`raw_authenticator_data`](Self::raw_authenticator_data).
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedResponse {
    pub id: Option<String>,
    pub raw_id: Option<String>,
    pub type_: Option<String>,
    pub authenticator_attachment: Option<String>,
    pub client_extension_results: Option<Value>,
    /// Members not recognized above, kept verbatim
    pub extra: Map<String, Value>,
    pub response: AuthenticatorResponse,
    raw_client_data: Vec<u8>,
    raw_authenticator_data: Vec<u8>,
}

impl ParsedResponse {
    /// `clientDataJSON` exactly as received, after base64 decoding
    pub fn raw_client_data(&self) -> &[u8] {
        &self.raw_client_data
    }

    /// Authenticator data exactly as received; for registrations this is the
    /// `authData` byte string nested in the attestation object
    pub fn raw_authenticator_data(&self) -> &[u8] {
        &self.raw_authenticator_data
    }

    pub fn client_data(&self) -> &ClientData {
        &self.response.client_data
    }

    pub fn authenticator_data(&self) -> &AuthenticatorData {
        match &self.response.body {
            ResponseBody::Attestation(attestation) => &attestation.auth_data,
            ResponseBody::Assertion(auth_data) => auth_data,
        }
    }

    pub fn attestation_object(&self) -> Option<&AttestationObject> {
        match &self.response.body {
            ResponseBody::Attestation(attestation) => Some(attestation),
            ResponseBody::Assertion(_) => None,
        }
    }

    /// JWK of the attested credential public key, for registrations that carry one
    pub fn jwk(&self) -> Option<Jwk> {
        self.attestation_object()?
            .auth_data
            .attested_credential_data
            .as_ref()
            .map(|data| cose_to_jwk(&data.credential_public_key))
    }
}

/// Parses a `PublicKeyCredential` as serialized by the browser.
pub fn parse(input: impl Into<ResponseInput>) -> Result<ParsedResponse, WebAuthnError> {
    let value = match input.into() {
        ResponseInput::Json(value) => value,
        ResponseInput::Text(text) => serde_json::from_str(&text)?,
        ResponseInput::Bytes(bytes) => serde_json::from_slice(&bytes)?,
    };

    let mut fields = match value {
        Value::Object(fields) => fields,
        other => return Err(WebAuthnError::Parse(format!("Cannot parse {other}"))),
    };

    let Some(Value::Object(mut response)) = fields.remove("response") else {
        return Err(WebAuthnError::Parse(
            "'response' must be an object".to_string(),
        ));
    };

    let client_data_json = take_required(&mut response, "clientDataJSON")?;
    let raw_client_data =
        BinaryData::from_json(&client_data_json, "response.clientDataJSON")?
            .to_bytes("response.clientDataJSON")?;
    let client_data = ClientData::from_slice(&raw_client_data)?;

    tracing::debug!("Parsed client data: {:?}", client_data);

    let (body, raw_authenticator_data) = match client_data.ceremony()? {
        CeremonyType::Create => {
            let attestation_object = take_required(&mut response, "attestationObject")?;
            let bytes = BinaryData::from_json(&attestation_object, "response.attestationObject")?
                .to_bytes("response.attestationObject")?;
            let (attestation, raw_auth_data) = parse_attestation_object(&bytes)?;
            (ResponseBody::Attestation(attestation), raw_auth_data)
        }
        CeremonyType::Get => {
            let authenticator_data = take_required(&mut response, "authenticatorData")?;
            let raw_auth_data =
                BinaryData::from_json(&authenticator_data, "response.authenticatorData")?
                    .to_bytes("response.authenticatorData")?;
            let auth_data = parse_authenticator_data(&raw_auth_data)?;
            (ResponseBody::Assertion(auth_data), raw_auth_data)
        }
    };

    tracing::debug!("Parsed authenticator data: {:?}", body);

    let authenticator_response = AuthenticatorResponse {
        client_data,
        body,
        signature: take_binary(&mut response, "signature")?,
        user_handle: take_binary(&mut response, "userHandle")?,
        transports: take_typed(&mut response, "transports")?,
        extra: response,
    };

    Ok(ParsedResponse {
        id: take_typed(&mut fields, "id")?,
        raw_id: take_typed(&mut fields, "rawId")?,
        type_: take_typed(&mut fields, "type")?,
        authenticator_attachment: take_typed(&mut fields, "authenticatorAttachment")?,
        client_extension_results: fields
            .remove("clientExtensionResults")
            .filter(|v| !v.is_null()),
        extra: fields,
        response: authenticator_response,
        raw_client_data,
        raw_authenticator_data,
    })
}

/// Decodes `{fmt, attStmt, authData}` and returns it together with the
/// nested `authData` bytes as they appeared in the CBOR.
fn parse_attestation_object(bytes: &[u8]) -> Result<(AttestationObject, Vec<u8>), WebAuthnError> {
    let attestation_cbor: CborValue = ciborium::de::from_reader(bytes)
        .map_err(|e| WebAuthnError::Parse(format!("Invalid attestationObject CBOR: {e}")))?;

    let CborValue::Map(map) = attestation_cbor else {
        return Err(WebAuthnError::Parse(
            "attestationObject must be a CBOR map".to_string(),
        ));
    };

    let mut fmt = None;
    let mut auth_data = None;
    let mut att_stmt = None;

    for (key, value) in map {
        if let CborValue::Text(k) = key {
            match (k.as_str(), value) {
                ("fmt", CborValue::Text(f)) => fmt = Some(f),
                ("authData", CborValue::Bytes(d)) => auth_data = Some(d),
                ("attStmt", stmt @ CborValue::Map(_)) => att_stmt = Some(stmt),
                (other, _) => {
                    tracing::debug!("Ignoring attestationObject member {other}");
                }
            }
        }
    }

    match (fmt, att_stmt, auth_data) {
        (Some(fmt), Some(att_stmt), Some(raw)) => {
            tracing::debug!("Attestation format: {fmt}");
            let auth_data = parse_authenticator_data(&raw)?;
            Ok((
                AttestationObject {
                    fmt,
                    att_stmt,
                    auth_data,
                },
                raw,
            ))
        }
        _ => Err(WebAuthnError::Parse(
            "attestationObject is missing fmt, attStmt or authData".to_string(),
        )),
    }
}

fn take_required(map: &mut Map<String, Value>, key: &str) -> Result<Value, WebAuthnError> {
    map.remove(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| WebAuthnError::Parse(format!("Missing 'response.{key}'")))
}

fn take_binary(
    map: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<BinaryData>, WebAuthnError> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(BinaryData::from_json(
            &value,
            &format!("response.{key}"),
        )?)),
    }
}

fn take_typed<T: serde::de::DeserializeOwned>(
    map: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<T>, WebAuthnError> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| WebAuthnError::Parse(format!("Invalid '{key}': {e}"))),
    }
}
