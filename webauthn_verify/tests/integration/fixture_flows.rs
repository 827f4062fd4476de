use serde_json::json;
use webauthn_verify::{
    CeremonyType, CounterViolation, Jwk, UserFactor, UserFactorRequirement, VerifyOptions,
    WebAuthnError, parse, to_buffer, verify,
};

use crate::common::constants::captured;
use crate::common::{
    captured_assertion, captured_assertion_with_signature, captured_create_options,
    captured_get_options, captured_public_key, captured_registration,
};

#[test]
fn test_captured_registration_verifies() {
    let response = parse(captured_registration()).expect("registration parses");

    let attestation = response.attestation_object().expect("attestation object");
    assert_eq!(attestation.fmt, "none");
    assert!(response.authenticator_data().flags.at);
    assert_eq!(response.authenticator_data().sign_count, 0);

    let credential = response
        .authenticator_data()
        .attested_credential_data
        .as_ref()
        .expect("attested credential data");
    assert_eq!(credential.credential_id, to_buffer(captured::RAW_ID).unwrap());
    assert_eq!(
        credential.credential_id,
        to_buffer(captured::CREDENTIAL_ID).unwrap()
    );

    verify(&response, &captured_create_options()).expect("registration verifies");
}

#[test]
fn test_captured_registration_exports_jwk() {
    let response = parse(captured_registration()).unwrap();
    let jwk = response.jwk().expect("jwk");

    assert_eq!(jwk.kty.as_deref(), Some("EC"));
    assert_eq!(jwk.alg.as_deref(), Some("ES256"));
    assert_eq!(jwk.crv.as_deref(), Some("P-256"));
    assert_eq!(to_buffer(jwk.x.clone().unwrap()).unwrap().len(), 32);
    assert_eq!(to_buffer(jwk.y.clone().unwrap()).unwrap().len(), 32);
    assert!(jwk.d.is_none());
}

#[test]
fn test_captured_assertion_verifies() {
    let response = parse(captured_assertion()).expect("assertion parses");
    assert_eq!(
        response.authenticator_data().sign_count,
        captured::ASSERTION_SIGN_COUNT
    );

    verify(&response, &captured_get_options()).expect("assertion verifies");
    verify(
        &response,
        &captured_get_options().with_counter(captured::ASSERTION_SIGN_COUNT - 1),
    )
    .expect("assertion verifies with counter");
}

#[test]
fn test_captured_assertion_verifies_with_stored_jwk() {
    // A relying party would typically store the JWK as JSON
    let jwk_json = serde_json::to_value(captured_public_key().to_jwk()).unwrap();
    let jwk: Jwk = serde_json::from_value(jwk_json).unwrap();

    let response = parse(captured_assertion()).unwrap();
    let options = captured_get_options().with_public_key(jwk);
    verify(&response, &options).expect("assertion verifies against JWK");
}

#[test]
fn test_captured_assertion_verifies_with_json_options() {
    let jwk = serde_json::to_value(captured_public_key().to_jwk()).unwrap();
    let options: VerifyOptions = serde_json::from_value(json!({
        "type": "webauthn.get",
        "challenge": captured::CHALLENGE,
        "origins": [captured::ORIGIN],
        "publicKey": jwk,
        "userFactor": ["verified", "present"],
        "userHandle": captured::USER_HANDLE,
        "rpId": captured::RP_ID,
    }))
    .unwrap();

    let response = parse(captured_assertion().to_string()).unwrap();
    verify(&response, &options).expect("assertion verifies");
}

/// Options as a caller stores them before the first assertion: counter `0`
/// means no baseline yet.
#[test]
fn test_captured_flow_with_zero_counter() {
    let jwk = serde_json::to_value(captured_public_key().to_jwk()).unwrap();

    let registration = parse(captured_registration()).unwrap();
    let create_options: VerifyOptions = serde_json::from_value(json!({
        "type": "webauthn.create",
        "challenge": captured::CHALLENGE,
        "origins": [captured::ORIGIN],
        "counter": 0,
        "userFactor": ["verified", "present"],
        "rpId": captured::RP_ID,
    }))
    .unwrap();
    verify(&registration, &create_options).expect("registration verifies");

    let assertion = parse(captured_assertion()).unwrap();
    let get_options: VerifyOptions = serde_json::from_value(json!({
        "type": "webauthn.get",
        "challenge": captured::CHALLENGE,
        "origins": [captured::ORIGIN],
        "publicKey": jwk,
        "counter": 0,
        "userFactor": ["verified", "present"],
        "userHandle": captured::USER_HANDLE,
        "rpId": captured::RP_ID,
    }))
    .unwrap();
    verify(&assertion, &get_options).expect("assertion verifies");
}

#[test]
fn test_every_signature_byte_flip_is_rejected() {
    let signature = to_buffer(captured::SIGNATURE).unwrap();
    let options = captured_get_options();

    for i in 0..signature.len() {
        let mut tampered = signature.clone();
        tampered[i] ^= 0x01;
        let response = captured_assertion_with_signature(&tampered);
        assert!(
            matches!(verify(&response, &options), Err(WebAuthnError::Signature(_))),
            "flipped byte {i} was accepted"
        );
    }
}

#[test]
fn test_rp_id_must_hash_to_rp_id_hash() {
    let response = parse(captured_assertion()).unwrap();
    assert!(verify(&response, &captured_get_options().with_rp_id("localhost")).is_ok());

    for rp_id in ["localhost.", "example.com", "LOCALHOST", ""] {
        assert!(
            matches!(
                verify(&response, &captured_get_options().with_rp_id(rp_id)),
                Err(WebAuthnError::RpIdMismatch { .. })
            ),
            "{rp_id:?} accepted"
        );
    }
}

#[test]
fn test_origin_not_allowed() {
    let response = parse(captured_assertion()).unwrap();
    let mut options = captured_get_options();
    options.origins = vec!["http://localhost:5501".into(), "https://localhost:5500".into()];

    assert!(matches!(
        verify(&response, &options),
        Err(WebAuthnError::OriginMismatch(origin)) if origin == captured::ORIGIN
    ));

    options.origins.push(captured::ORIGIN.into());
    assert!(verify(&response, &options).is_ok());
}

#[test]
fn test_counter_must_advance_by_one() {
    let response = parse(captured_assertion()).unwrap();
    let check = |counter| verify(&response, &captured_get_options().with_counter(counter));

    assert!(check(1).is_ok());
    assert!(matches!(
        check(2),
        Err(WebAuthnError::Counter(CounterViolation::Replay(2)))
    ));
    // zero is no baseline, so the jump from 0 to 2 is not a gap
    assert!(check(0).is_ok());
    assert!(matches!(
        check(5),
        Err(WebAuthnError::Counter(CounterViolation::Rollback { got: 2, expected: 5 }))
    ));
}

#[test]
fn test_user_factor_requirements() {
    // captured assertion has both up and uv
    let response = parse(captured_assertion()).unwrap();
    for factor in [
        UserFactor::Either,
        UserFactor::All(vec![UserFactorRequirement::Verified]),
        UserFactor::All(vec![UserFactorRequirement::Present]),
    ] {
        assert!(verify(&response, &captured_get_options().with_user_factor(factor)).is_ok());
    }

    // Clear the uv bit: the signature no longer matches, but the user factor
    // check runs first
    let mut tampered = captured_assertion();
    let mut auth_data = to_buffer(captured::AUTHENTICATOR_DATA).unwrap();
    auth_data[32] &= !0x04;
    tampered["response"]["authenticatorData"] = json!(auth_data);
    let response = parse(tampered).unwrap();

    assert!(matches!(
        verify(
            &response,
            &captured_get_options()
                .with_user_factor(UserFactor::All(vec![UserFactorRequirement::Verified]))
        ),
        Err(WebAuthnError::UserFactor(_))
    ));
    assert!(matches!(
        verify(&response, &captured_get_options().with_user_factor(UserFactor::Either)),
        Err(WebAuthnError::Signature(_))
    ));
}

#[test]
fn test_user_handle_mismatch() {
    let response = parse(captured_assertion()).unwrap();
    assert!(matches!(
        verify(&response, &captured_get_options().with_user_handle("BQ==")),
        Err(WebAuthnError::UserHandleMismatch(_))
    ));
    assert!(verify(&response, &captured_get_options().with_user_handle(vec![4u8])).is_ok());
}

#[test]
fn test_wrong_ceremony_type() {
    let registration = parse(captured_registration()).unwrap();
    let options = VerifyOptions::new(CeremonyType::Get, captured::CHALLENGE, [captured::ORIGIN]);
    assert!(matches!(
        verify(&registration, &options),
        Err(WebAuthnError::TypeMismatch { .. })
    ));
}

#[test]
fn test_challenge_mismatch() {
    let response = parse(captured_assertion()).unwrap();
    let mut options = captured_get_options();
    options.challenge = "Y2hhbGxlbmdl".into();
    assert!(matches!(
        verify(&response, &options),
        Err(WebAuthnError::ChallengeMismatch { .. })
    ));
}
