mod core;
mod none;
mod packed;
mod u2f;
mod utils;

pub(crate) use core::verify_attestation;
