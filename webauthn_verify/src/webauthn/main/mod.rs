mod attestation;
mod auth_data;
mod options;
mod parse;
mod signature;
mod verify;

pub use auth_data::{
    AttestedCredentialData, AuthenticatorData, AuthenticatorFlags, parse_authenticator_data,
};

pub use options::{PublicKey, RawPublicKey, UserFactor, UserFactorRequirement, VerifyOptions};

pub use parse::{
    AttestationObject, AuthenticatorResponse, ParsedResponse, ResponseBody, ResponseInput, parse,
};

pub use verify::verify;
