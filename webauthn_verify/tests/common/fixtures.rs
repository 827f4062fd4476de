//! Response builders shared by the integration tests

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use ciborium::value::Value as CborValue;
use ring::digest;
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, Ed25519KeyPair, KeyPair,
};
use serde_json::{Value, json};

use webauthn_verify::{CeremonyType, CoseKey, ParsedResponse, UserFactor, UserFactorRequirement, VerifyOptions, parse};

use super::constants::{captured, generated};

/// The captured registration response as the browser serialized it
pub fn captured_registration() -> Value {
    json!({
        "id": captured::CREDENTIAL_ID,
        "rawId": captured::RAW_ID,
        "type": "public-key",
        "response": {
            "clientDataJSON": captured::REGISTRATION_CLIENT_DATA,
            "attestationObject": captured::ATTESTATION_OBJECT,
        }
    })
}

pub fn captured_assertion() -> Value {
    json!({
        "id": captured::CREDENTIAL_ID,
        "rawId": captured::RAW_ID,
        "type": "public-key",
        "response": {
            "clientDataJSON": captured::ASSERTION_CLIENT_DATA,
            "authenticatorData": captured::AUTHENTICATOR_DATA,
            "signature": captured::SIGNATURE,
            "userHandle": captured::USER_HANDLE,
        }
    })
}

/// Credential public key attested by the captured registration
pub fn captured_public_key() -> CoseKey {
    let registration = parse(captured_registration()).expect("captured registration parses");
    registration
        .authenticator_data()
        .attested_credential_data
        .as_ref()
        .expect("attested credential data")
        .credential_public_key
        .clone()
}

pub fn captured_create_options() -> VerifyOptions {
    VerifyOptions::new(CeremonyType::Create, captured::CHALLENGE, [captured::ORIGIN])
        .with_user_factor(UserFactor::All(vec![
            UserFactorRequirement::Verified,
            UserFactorRequirement::Present,
        ]))
        .with_rp_id(captured::RP_ID)
}

pub fn captured_get_options() -> VerifyOptions {
    VerifyOptions::new(CeremonyType::Get, captured::CHALLENGE, [captured::ORIGIN])
        .with_user_factor(UserFactor::All(vec![
            UserFactorRequirement::Verified,
            UserFactorRequirement::Present,
        ]))
        .with_public_key(captured_public_key())
        .with_user_handle(captured::USER_HANDLE)
        .with_rp_id(captured::RP_ID)
}

/// Captured assertion with its signature replaced
pub fn captured_assertion_with_signature(signature: &[u8]) -> ParsedResponse {
    let mut response = captured_assertion();
    response["response"]["signature"] = json!(STANDARD.encode(signature));
    parse(response).expect("assertion with replaced signature parses")
}

fn cbor_bytes(value: &CborValue) -> Vec<u8> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).expect("CBOR serialization");
    out
}

fn int(i: i64) -> CborValue {
    CborValue::Integer(i.into())
}

/// Key material behind a generated authenticator
pub enum TestKey {
    P256(EcdsaKeyPair),
    Ed25519(Ed25519KeyPair),
}

/// Software authenticator producing real signatures
pub struct TestAuthenticator {
    key: TestKey,
    rng: SystemRandom,
}

impl TestAuthenticator {
    pub fn p256() -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
            .expect("key generation");
        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
                .expect("key parsing");
        Self {
            key: TestKey::P256(key_pair),
            rng,
        }
    }

    pub fn ed25519() -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).expect("key generation");
        let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).expect("key parsing");
        Self {
            key: TestKey::Ed25519(key_pair),
            rng,
        }
    }

    pub fn cose_alg(&self) -> i64 {
        match self.key {
            TestKey::P256(_) => -7,
            TestKey::Ed25519(_) => -8,
        }
    }

    pub fn cose_key(&self) -> CborValue {
        match &self.key {
            TestKey::P256(key_pair) => {
                let point = key_pair.public_key().as_ref();
                CborValue::Map(vec![
                    (int(1), int(2)),
                    (int(3), int(-7)),
                    (int(-1), int(1)),
                    (int(-2), CborValue::Bytes(point[1..33].to_vec())),
                    (int(-3), CborValue::Bytes(point[33..65].to_vec())),
                ])
            }
            TestKey::Ed25519(key_pair) => CborValue::Map(vec![
                (int(1), int(1)),
                (int(3), int(-8)),
                (int(-1), int(6)),
                (int(-2), CborValue::Bytes(key_pair.public_key().as_ref().to_vec())),
            ]),
        }
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match &self.key {
            TestKey::P256(key_pair) => key_pair
                .sign(&self.rng, message)
                .expect("signing")
                .as_ref()
                .to_vec(),
            TestKey::Ed25519(key_pair) => key_pair.sign(message).as_ref().to_vec(),
        }
    }

    /// Signs `auth_data || SHA-256(client_data)`
    pub fn sign_over(&self, auth_data: &[u8], client_data: &[u8]) -> Vec<u8> {
        let mut signed = auth_data.to_vec();
        signed.extend_from_slice(digest::digest(&digest::SHA256, client_data).as_ref());
        self.sign(&signed)
    }

    /// Authenticator data, with attested credential data when `attested` is set
    pub fn auth_data(&self, flags: u8, sign_count: u32, attested: bool) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(
            digest::digest(&digest::SHA256, generated::RP_ID.as_bytes()).as_ref(),
        );
        data.push(flags);
        data.extend_from_slice(&sign_count.to_be_bytes());
        if attested {
            data.extend_from_slice(&[0x2a; 16]);
            data.extend_from_slice(&(generated::CREDENTIAL_ID.len() as u16).to_be_bytes());
            data.extend_from_slice(generated::CREDENTIAL_ID);
            data.extend_from_slice(&cbor_bytes(&self.cose_key()));
        }
        data
    }
}

pub fn client_data(type_: &str, challenge: &[u8], origin: &str) -> Vec<u8> {
    json!({
        "type": type_,
        "challenge": URL_SAFE_NO_PAD.encode(challenge),
        "origin": origin,
        "crossOrigin": false,
    })
    .to_string()
    .into_bytes()
}

/// Registration response signed with packed self attestation
pub fn packed_self_registration(authenticator: &TestAuthenticator) -> Value {
    let client_data = client_data("webauthn.create", generated::CHALLENGE, generated::ORIGIN);
    let auth_data = authenticator.auth_data(0x45, 0, true);
    let sig = authenticator.sign_over(&auth_data, &client_data);

    let attestation_object = cbor_bytes(&CborValue::Map(vec![
        (CborValue::Text("fmt".into()), CborValue::Text("packed".into())),
        (
            CborValue::Text("attStmt".into()),
            CborValue::Map(vec![
                (CborValue::Text("alg".into()), int(authenticator.cose_alg())),
                (CborValue::Text("sig".into()), CborValue::Bytes(sig)),
            ]),
        ),
        (CborValue::Text("authData".into()), CborValue::Bytes(auth_data)),
    ]));

    json!({
        "id": URL_SAFE_NO_PAD.encode(generated::CREDENTIAL_ID),
        "rawId": STANDARD.encode(generated::CREDENTIAL_ID),
        "type": "public-key",
        "authenticatorAttachment": "cross-platform",
        "response": {
            "clientDataJSON": URL_SAFE_NO_PAD.encode(&client_data),
            "attestationObject": URL_SAFE_NO_PAD.encode(&attestation_object),
            "transports": ["usb"],
        }
    })
}

/// Authentication response; byte members are sent as arrays, the way a
/// client that skips base64 would send them
pub fn generated_assertion(authenticator: &TestAuthenticator, flags: u8, sign_count: u32) -> Value {
    let client_data = client_data("webauthn.get", generated::CHALLENGE, generated::ORIGIN);
    let auth_data = authenticator.auth_data(flags, sign_count, false);
    let sig = authenticator.sign_over(&auth_data, &client_data);

    json!({
        "id": URL_SAFE_NO_PAD.encode(generated::CREDENTIAL_ID),
        "type": "public-key",
        "response": {
            "clientDataJSON": client_data,
            "authenticatorData": auth_data,
            "signature": sig,
            "userHandle": {"type": "Buffer", "data": [7, 7, 7]},
        }
    })
}

pub fn generated_get_options(public_key: CoseKey) -> VerifyOptions {
    VerifyOptions::new(CeremonyType::Get, generated::CHALLENGE, [generated::ORIGIN])
        .with_public_key(public_key)
        .with_user_handle(vec![7u8, 7, 7])
        .with_rp_id(generated::RP_ID)
}
