//! webauthn_verify - WebAuthn relying-party response verification
//!
//! Parses registration (attestation) and authentication (assertion) responses
//! as produced by `navigator.credentials.create()` / `get()`, and checks them
//! against caller policy: origin, challenge, signature counter, user presence
//! and verification, user handle, signature, attestation statement and RP id.
//!
//! ```ignore
//! let response = webauthn_verify::parse(json)?;
//! let options = VerifyOptions::new(CeremonyType::Get, challenge, ["https://example.com"])
//!     .with_public_key(stored_key)
//!     .with_counter(stored_counter)
//!     .with_rp_id("example.com");
//! webauthn_verify::verify(&response, &options)?;
//! ```

mod config;
mod utils;
mod webauthn;

pub use utils::{BinaryData, UtilError, to_buffer};

pub use webauthn::{
    AttestationObject, AttestedCredentialData, AuthenticatorData, AuthenticatorFlags,
    AuthenticatorResponse, CeremonyType, ClientData, CoseAlgorithm, CoseKey, CounterViolation,
    Ec2Key, EllipticCurve, Jwk, OkpKey, ParsedResponse, PublicKey, RawPublicKey, ResponseBody,
    ResponseInput, RsaKey, TokenBinding, UserFactor, UserFactorRequirement, VerifyOptions,
    WebAuthnError, cose_to_jwk, parse, parse_authenticator_data, verify,
};
