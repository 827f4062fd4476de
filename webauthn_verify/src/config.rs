//! Process-wide defaults for verification policy, read from the environment

use std::{env, sync::LazyLock};

/// Primary allowed origin, e.g. `https://example.com`
pub(crate) static ORIGIN: LazyLock<Option<String>> = LazyLock::new(|| {
    env::var("ORIGIN")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
});

/// Further allowed origins, comma separated in `WEBAUTHN_ADDITIONAL_ORIGINS`
pub(crate) static ADDITIONAL_ORIGINS: LazyLock<Vec<String>> = LazyLock::new(|| {
    env::var("WEBAUTHN_ADDITIONAL_ORIGINS")
        .map(|origins| parse_origin_list(&origins))
        .unwrap_or_default()
});

/// `PASSKEY_RP_ID`, falling back to the host part of `ORIGIN`
pub(crate) static PASSKEY_RP_ID: LazyLock<Option<String>> = LazyLock::new(|| {
    env::var("PASSKEY_RP_ID")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| ORIGIN.as_deref().and_then(rp_id_from_origin))
});

fn parse_origin_list(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn rp_id_from_origin(origin: &str) -> Option<String> {
    origin
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split([':', '/'])
        .next()
        .filter(|host| !host.is_empty())
        .map(|host| host.to_string())
}
