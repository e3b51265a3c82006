use ciborium::value::Value as CborValue;
use ring::signature::{self, RsaPublicKeyComponents, UnparsedPublicKey};

use crate::passkey::errors::PasskeyError;

pub(crate) const ES256: i64 = -7;
pub(crate) const RS256: i64 = -257;

const KTY_EC2: i64 = 2;
const KTY_RSA: i64 = 3;
const CRV_P256: i64 = 1;

// COSE_Key labels
const LABEL_KTY: i64 = 1;
const LABEL_ALG: i64 = 3;
const LABEL_EC2_CRV: i64 = -1;
const LABEL_EC2_X: i64 = -2;
const LABEL_EC2_Y: i64 = -3;
const LABEL_RSA_N: i64 = -1;
const LABEL_RSA_E: i64 = -2;

/// A credential public key in a form `ring` can verify with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CredentialPublicKey {
    /// Uncompressed P-256 point, `0x04 || x || y`.
    Es256 { point: Vec<u8> },
    Rs256 { n: Vec<u8>, e: Vec<u8> },
}

pub(crate) fn cbor_int(value: &CborValue) -> Option<i64> {
    match value {
        CborValue::Integer(i) => i64::try_from(*i).ok(),
        _ => None,
    }
}

pub(crate) fn map_get<'a>(map: &'a [(CborValue, CborValue)], label: i64) -> Option<&'a CborValue> {
    map.iter()
        .find(|(k, _)| cbor_int(k) == Some(label))
        .map(|(_, v)| v)
}

pub(crate) fn map_get_text<'a>(
    map: &'a [(CborValue, CborValue)],
    name: &str,
) -> Option<&'a CborValue> {
    map.iter()
        .find(|(k, _)| matches!(k, CborValue::Text(t) if t == name))
        .map(|(_, v)| v)
}

fn bytes_at(map: &[(CborValue, CborValue)], label: i64) -> Result<Vec<u8>, PasskeyError> {
    match map_get(map, label) {
        Some(CborValue::Bytes(b)) => Ok(b.clone()),
        _ => Err(PasskeyError::Format(format!(
            "COSE key is missing byte string at label {label}"
        ))),
    }
}

fn int_at(map: &[(CborValue, CborValue)], label: i64) -> Result<i64, PasskeyError> {
    map_get(map, label).and_then(cbor_int).ok_or_else(|| {
        PasskeyError::Format(format!("COSE key is missing integer at label {label}"))
    })
}

impl CredentialPublicKey {
    pub(crate) fn from_cose(bytes: &[u8]) -> Result<Self, PasskeyError> {
        let value: CborValue = ciborium::de::from_reader(bytes)
            .map_err(|e| PasskeyError::Format(format!("Invalid public key CBOR: {e}")))?;
        let CborValue::Map(map) = value else {
            return Err(PasskeyError::Format("COSE key is not a map".into()));
        };

        let kty = int_at(&map, LABEL_KTY)?;
        let alg = int_at(&map, LABEL_ALG)?;

        match (kty, alg) {
            (KTY_EC2, ES256) => {
                let crv = int_at(&map, LABEL_EC2_CRV)?;
                if crv != CRV_P256 {
                    return Err(PasskeyError::Verification(format!(
                        "Unsupported curve: {crv}"
                    )));
                }
                let x = bytes_at(&map, LABEL_EC2_X)?;
                let y = bytes_at(&map, LABEL_EC2_Y)?;
                if x.len() != 32 || y.len() != 32 {
                    return Err(PasskeyError::Format(
                        "Invalid P-256 coordinate length".into(),
                    ));
                }
                let mut point = Vec::with_capacity(65);
                point.push(0x04);
                point.extend_from_slice(&x);
                point.extend_from_slice(&y);
                Ok(Self::Es256 { point })
            }
            (KTY_RSA, RS256) => Ok(Self::Rs256 {
                n: bytes_at(&map, LABEL_RSA_N)?,
                e: bytes_at(&map, LABEL_RSA_E)?,
            }),
            _ => Err(PasskeyError::Verification(format!(
                "Unsupported key type {kty} with algorithm {alg}"
            ))),
        }
    }

    /// Stored keys are COSE_Key bytes. Older records may hold the raw P-256 point instead.
    pub(crate) fn from_stored(bytes: &[u8]) -> Result<Self, PasskeyError> {
        if bytes.len() == 65 && bytes[0] == 0x04 {
            return Ok(Self::Es256 {
                point: bytes.to_vec(),
            });
        }
        Self::from_cose(bytes)
    }

    pub(crate) fn algorithm(&self) -> i64 {
        match self {
            Self::Es256 { .. } => ES256,
            Self::Rs256 { .. } => RS256,
        }
    }

    pub(crate) fn verify(&self, message: &[u8], sig: &[u8]) -> Result<(), PasskeyError> {
        let result = match self {
            Self::Es256 { point } => {
                UnparsedPublicKey::new(&signature::ECDSA_P256_SHA256_ASN1, point).verify(message, sig)
            }
            Self::Rs256 { n, e } => RsaPublicKeyComponents {
                n: strip_leading_zeros(n),
                e: strip_leading_zeros(e),
            }
            .verify(&signature::RSA_PKCS1_2048_8192_SHA256, message, sig),
        };

        result.map_err(|_| {
            tracing::debug!(alg = self.algorithm(), "Signature verification failed");
            PasskeyError::Verification(
                "Signature verification failed. For more details, run with RUST_LOG=debug".into(),
            )
        })
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
