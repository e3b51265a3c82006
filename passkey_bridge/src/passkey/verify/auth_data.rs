use ciborium::value::Value as CborValue;
use ring::digest;
use std::io::Cursor;

use crate::passkey::codec::decode_base64;
use crate::passkey::errors::PasskeyError;

const MIN_AUTH_DATA_LEN: usize = 37;
const MAX_CREDENTIAL_ID_LEN: usize = 1024;

/// Flags for AuthenticatorData as defined in WebAuthn Level 2
mod flags {
    /// User Present (UP) - Bit 0
    pub(super) const UP: u8 = 1 << 0;
    /// User Verified (UV) - Bit 2
    pub(super) const UV: u8 = 1 << 2;
    /// Backup Eligibility (BE) - Bit 3
    pub(super) const BE: u8 = 1 << 3;
    /// Backup State (BS) - Bit 4
    pub(super) const BS: u8 = 1 << 4;
    /// Attested Credential Data Present - Bit 6
    pub(super) const AT: u8 = 1 << 6;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttestedCredentialData {
    pub(crate) aaguid: [u8; 16],
    pub(crate) credential_id: Vec<u8>,
    /// The COSE_Key exactly as it appeared in the authenticator data.
    pub(crate) public_key: Vec<u8>,
}

/// Authenticator data:
/// rpIdHash (32) | flags (1) | signCount (4, big-endian) | attested credential data | extensions
#[derive(Debug)]
pub(crate) struct AuthenticatorData {
    pub(crate) rp_id_hash: Vec<u8>,
    pub(crate) flags: u8,
    pub(crate) counter: u32,
    pub(crate) attested_credential: Option<AttestedCredentialData>,
    pub(crate) raw_data: Vec<u8>,
}

impl AuthenticatorData {
    pub(crate) fn from_base64(auth_data: &str) -> Result<Self, PasskeyError> {
        let data = decode_base64(auth_data)
            .ok_or_else(|| PasskeyError::Format("Failed to decode authenticator data".into()))?;
        Self::from_bytes(data)
    }

    pub(crate) fn from_bytes(data: Vec<u8>) -> Result<Self, PasskeyError> {
        if data.len() < MIN_AUTH_DATA_LEN {
            return Err(PasskeyError::AuthenticatorData(
                "Authenticator data too short. For more details, run with RUST_LOG=debug".into(),
            ));
        }

        let flag_bits = data[32];
        let attested_credential = if flag_bits & flags::AT != 0 {
            Some(parse_attested_credential_data(&data[MIN_AUTH_DATA_LEN..])?)
        } else {
            None
        };

        Ok(Self {
            rp_id_hash: data[..32].to_vec(),
            flags: flag_bits,
            counter: u32::from_be_bytes([data[33], data[34], data[35], data[36]]),
            attested_credential,
            raw_data: data,
        })
    }

    pub(crate) fn is_user_present(&self) -> bool {
        self.flags & flags::UP != 0
    }

    pub(crate) fn is_user_verified(&self) -> bool {
        self.flags & flags::UV != 0
    }

    pub(crate) fn is_backup_eligible(&self) -> bool {
        self.flags & flags::BE != 0
    }

    pub(crate) fn is_backed_up(&self) -> bool {
        self.flags & flags::BS != 0
    }

    /// Checks the RP ID hash, user presence and, when required, user verification.
    pub(crate) fn verify(
        &self,
        rp_id: &str,
        user_verification_required: bool,
    ) -> Result<(), PasskeyError> {
        let expected_hash = digest::digest(&digest::SHA256, rp_id.as_bytes());
        if self.rp_id_hash != expected_hash.as_ref() {
            return Err(PasskeyError::AuthenticatorData(format!(
                "Invalid RP ID hash for {rp_id}"
            )));
        }

        if !self.is_user_present() {
            return Err(PasskeyError::AuthenticatorData(
                "User not present. For more details, run with RUST_LOG=debug".into(),
            ));
        }

        if user_verification_required && !self.is_user_verified() {
            return Err(PasskeyError::AuthenticatorData(format!(
                "User verification required but flag not set. Flags: {:02x}",
                self.flags
            )));
        }

        tracing::debug!(
            user_verified = self.is_user_verified(),
            backup_eligible = self.is_backup_eligible(),
            backed_up = self.is_backed_up(),
            counter = self.counter,
            "Authenticator data verification passed"
        );
        Ok(())
    }
}

/// aaguid (16) | credentialIdLength (2) | credentialId | credentialPublicKey (COSE, CBOR)
fn parse_attested_credential_data(data: &[u8]) -> Result<AttestedCredentialData, PasskeyError> {
    if data.len() < 18 {
        return Err(PasskeyError::AuthenticatorData(
            "Attested credential data too short".into(),
        ));
    }

    let mut aaguid = [0u8; 16];
    aaguid.copy_from_slice(&data[..16]);

    let cred_id_len = u16::from_be_bytes([data[16], data[17]]) as usize;
    if cred_id_len == 0 || cred_id_len > MAX_CREDENTIAL_ID_LEN {
        return Err(PasskeyError::AuthenticatorData(format!(
            "Invalid credential ID length: {cred_id_len}"
        )));
    }

    let rest = &data[18..];
    if rest.len() < cred_id_len {
        return Err(PasskeyError::AuthenticatorData(
            "Authenticator data too short for credential ID".into(),
        ));
    }
    let (credential_id, key_and_extensions) = rest.split_at(cred_id_len);

    // The key is followed by optional extension data, so its length is whatever
    // the CBOR decoder consumed.
    let mut cursor = Cursor::new(key_and_extensions);
    let _: CborValue = ciborium::de::from_reader(&mut cursor)
        .map_err(|e| PasskeyError::AuthenticatorData(format!("Invalid public key CBOR: {e}")))?;
    let key_len = cursor.position() as usize;

    Ok(AttestedCredentialData {
        aaguid,
        credential_id: credential_id.to_vec(),
        public_key: key_and_extensions[..key_len].to_vec(),
    })
}
