use ciborium::value::Value as CborValue;
use uuid::Uuid;

use crate::webauthn::cose::CoseKey;
use crate::webauthn::errors::WebAuthnError;

const RP_ID_HASH_LEN: usize = 32;
const FLAGS_OFFSET: usize = 32;
const SIGN_COUNT_OFFSET: usize = 33;
const ATTESTED_DATA_OFFSET: usize = 37;
const AAGUID_LEN: usize = 16;
const CREDENTIAL_ID_LENGTH_OFFSET: usize = 53;
const CREDENTIAL_ID_OFFSET: usize = 55;

/// Flags for AuthenticatorData as defined in WebAuthn Level 2
mod auth_data_flags {
    /// User Present (UP) - Bit 0
    pub(super) const UP: u8 = 1 << 0;
    /// Reserved for future use - Bit 1
    pub(super) const RFU1: u8 = 1 << 1;
    /// User Verified (UV) - Bit 2
    pub(super) const UV: u8 = 1 << 2;
    /// Backup Eligibility (BE) - Bit 3
    pub(super) const BE: u8 = 1 << 3;
    /// Backup State (BS) - Bit 4
    pub(super) const BS: u8 = 1 << 4;
    /// Reserved for future use - Bit 5
    pub(super) const RFU2: u8 = 1 << 5;
    /// Attested Credential Data Present - Bit 6
    pub(super) const AT: u8 = 1 << 6;
    /// Extension Data Present - Bit 7
    pub(super) const ED: u8 = 1 << 7;
}

/// The flags byte of authenticator data, one field per bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AuthenticatorFlags {
    pub up: bool,
    pub rfu1: bool,
    pub uv: bool,
    pub be: bool,
    pub bs: bool,
    pub rfu2: bool,
    pub at: bool,
    pub ed: bool,
}

impl AuthenticatorFlags {
    pub fn from_bits(bits: u8) -> Self {
        Self {
            up: bits & auth_data_flags::UP != 0,
            rfu1: bits & auth_data_flags::RFU1 != 0,
            uv: bits & auth_data_flags::UV != 0,
            be: bits & auth_data_flags::BE != 0,
            bs: bits & auth_data_flags::BS != 0,
            rfu2: bits & auth_data_flags::RFU2 != 0,
            at: bits & auth_data_flags::AT != 0,
            ed: bits & auth_data_flags::ED != 0,
        }
    }

    pub fn bits(&self) -> u8 {
        [
            (self.up, auth_data_flags::UP),
            (self.rfu1, auth_data_flags::RFU1),
            (self.uv, auth_data_flags::UV),
            (self.be, auth_data_flags::BE),
            (self.bs, auth_data_flags::BS),
            (self.rfu2, auth_data_flags::RFU2),
            (self.at, auth_data_flags::AT),
            (self.ed, auth_data_flags::ED),
        ]
        .into_iter()
        .filter(|(set, _)| *set)
        .fold(0, |acc, (_, bit)| acc | bit)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; AAGUID_LEN],
    pub credential_id_length: u16,
    pub credential_id: Vec<u8>,
    pub credential_public_key: CoseKey,
}

impl AttestedCredentialData {
    /// The AAGUID as a UUID, e.g. for authenticator metadata lookups
    pub fn aaguid_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.aaguid)
    }
}

/// AuthenticatorData structure as defined in WebAuthn Level 2
/// https://www.w3.org/TR/webauthn-2/#sctn-authenticator-data
#[derive(Clone, Debug, PartialEq)]
pub struct AuthenticatorData {
    /// SHA-256 hash of the RP ID
    pub rp_id_hash: [u8; RP_ID_HASH_LEN],
    pub flags: AuthenticatorFlags,
    /// Signature counter, 32-bit unsigned big-endian integer
    pub sign_count: u32,
    /// Present iff `flags.at`
    pub attested_credential_data: Option<AttestedCredentialData>,
    /// Present iff `flags.ed`
    pub extensions: Option<CborValue>,
}

/// Parses the binary authenticator data layout.
///
/// Format (minimum 37 bytes):
/// - RP ID Hash (32 bytes)
/// - Flags (1 byte)
/// - Counter (4 bytes)
/// - Optional: Attested Credential Data (when AT is set)
///   - AAGUID (16 bytes)
///   - Credential ID length L (2 bytes)
///   - Credential ID (L bytes)
///   - Credential public key (CBOR)
/// - Optional: Extensions (CBOR, when ED is set)
pub fn parse_authenticator_data(data: &[u8]) -> Result<AuthenticatorData, WebAuthnError> {
    let rp_id_hash: [u8; RP_ID_HASH_LEN] = fixed(data, 0, "rpIdHash")?;
    let [flags_byte] = fixed::<1>(data, FLAGS_OFFSET, "flags")?;
    let sign_count = u32::from_be_bytes(fixed(data, SIGN_COUNT_OFFSET, "signCount")?);
    let flags = AuthenticatorFlags::from_bits(flags_byte);

    let mut attested_credential_data = None;
    let mut extensions = None;

    if flags.at {
        let aaguid: [u8; AAGUID_LEN] = fixed(data, ATTESTED_DATA_OFFSET, "aaguid")?;
        let credential_id_length = u16::from_be_bytes(fixed(
            data,
            CREDENTIAL_ID_LENGTH_OFFSET,
            "credentialIdLength",
        )?);
        let credential_id = span(
            data,
            CREDENTIAL_ID_OFFSET,
            usize::from(credential_id_length),
            "credentialId",
        )?
        .to_vec();

        let mut rest = &data[CREDENTIAL_ID_OFFSET + credential_id.len()..];
        let key = decode_item(&mut rest, "credentialPublicKey")?;
        if flags.ed {
            extensions = Some(decode_item(&mut rest, "extensions")?);
        }
        if !rest.is_empty() {
            tracing::debug!("{} trailing bytes after authenticator data", rest.len());
        }

        attested_credential_data = Some(AttestedCredentialData {
            aaguid,
            credential_id_length,
            credential_id,
            credential_public_key: CoseKey::from_cbor(&key)?,
        });
    } else if flags.ed {
        let mut rest = &data[ATTESTED_DATA_OFFSET..];
        extensions = Some(decode_item(&mut rest, "extensions")?);
    }

    Ok(AuthenticatorData {
        rp_id_hash,
        flags,
        sign_count,
        attested_credential_data,
        extensions,
    })
}

fn span<'a>(
    data: &'a [u8],
    offset: usize,
    len: usize,
    what: &str,
) -> Result<&'a [u8], WebAuthnError> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            WebAuthnError::Parse(format!(
                "Authenticator data too short for {what}: need {} bytes at offset {offset}, have {}",
                len,
                data.len()
            ))
        })
}

fn fixed<const N: usize>(data: &[u8], offset: usize, what: &str) -> Result<[u8; N], WebAuthnError> {
    let bytes = span(data, offset, N, what)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

/// Decodes one CBOR item and advances `reader` past it.
fn decode_item(reader: &mut &[u8], what: &str) -> Result<CborValue, WebAuthnError> {
    ciborium::de::from_reader(&mut *reader)
        .map_err(|e| WebAuthnError::Parse(format!("Invalid {what} CBOR: {e}")))
}
