mod cose;
mod errors;
mod main;
mod types;

pub use cose::{
    CoseAlgorithm, CoseKey, Ec2Key, EllipticCurve, Jwk, OkpKey, RsaKey, cose_to_jwk,
};

pub use errors::{CounterViolation, WebAuthnError};

pub use main::{
    AttestationObject, AttestedCredentialData, AuthenticatorData, AuthenticatorFlags,
    AuthenticatorResponse, ParsedResponse, PublicKey, RawPublicKey, ResponseBody, ResponseInput,
    UserFactor, UserFactorRequirement, VerifyOptions, parse, parse_authenticator_data, verify,
};

pub use types::{CeremonyType, ClientData, TokenBinding};
