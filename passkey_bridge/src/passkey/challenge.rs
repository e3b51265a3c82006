use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::storage::{CacheData, CacheStore};
use crate::utils::gen_random_string;

use super::errors::PasskeyError;
use super::types::CeremonyType;

const CHALLENGE_PREFIX: &str = "challenge";
const CHALLENGE_BYTES: usize = 32;

/// A challenge as held in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredChallenge {
    pub subject_id: String,
    pub ceremony_type: CeremonyType,
    pub challenge: String,
    pub issued_at: DateTime<Utc>,
}

/// One-time challenges keyed by (subject, ceremony type).
///
/// Issuing replaces any outstanding challenge for the same key. Expiry is left to the
/// underlying cache's TTL.
#[derive(Clone)]
pub struct ChallengeStore {
    cache: Arc<dyn CacheStore>,
    ttl: u64,
}

impl ChallengeStore {
    pub fn new(cache: Arc<dyn CacheStore>, ttl: u64) -> Self {
        Self { cache, ttl }
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    fn key(subject_id: &str, ceremony: CeremonyType) -> String {
        format!("{subject_id}:{ceremony}")
    }

    #[tracing::instrument(skip(self), fields(ttl = self.ttl))]
    pub async fn issue(
        &self,
        subject_id: &str,
        ceremony: CeremonyType,
    ) -> Result<String, PasskeyError> {
        let challenge = gen_random_string(CHALLENGE_BYTES)?;
        let stored = StoredChallenge {
            subject_id: subject_id.to_string(),
            ceremony_type: ceremony,
            challenge: challenge.clone(),
            issued_at: Utc::now(),
        };
        let value = CacheData::from(serde_json::to_string(&stored)?);

        self.cache
            .put_with_ttl(
                CHALLENGE_PREFIX,
                &Self::key(subject_id, ceremony),
                value,
                self.ttl,
            )
            .await?;

        tracing::debug!("Challenge issued");
        Ok(challenge)
    }

    #[tracing::instrument(skip(self))]
    pub async fn fetch(
        &self,
        subject_id: &str,
        ceremony: CeremonyType,
    ) -> Result<Option<StoredChallenge>, PasskeyError> {
        let Some(data) = self
            .cache
            .get(CHALLENGE_PREFIX, &Self::key(subject_id, ceremony))
            .await?
        else {
            tracing::debug!("Challenge not found");
            return Ok(None);
        };

        let stored: StoredChallenge = serde_json::from_str(&data.value)?;
        Ok(Some(stored))
    }

    /// True only when a challenge is stored for the key and equals `expected` byte for byte.
    #[tracing::instrument(skip(self, expected))]
    pub async fn validate(
        &self,
        subject_id: &str,
        expected: &str,
        ceremony: CeremonyType,
    ) -> Result<bool, PasskeyError> {
        let Some(stored) = self.fetch(subject_id, ceremony).await? else {
            return Ok(false);
        };
        let matches: bool = stored
            .challenge
            .as_bytes()
            .ct_eq(expected.as_bytes())
            .into();
        if !matches {
            tracing::debug!("Challenge mismatch");
        }
        Ok(matches)
    }

    /// Deletes the challenge if it is still `expected`.
    ///
    /// Only one of several concurrent callers sees `true`, and a challenge issued after
    /// `expected` was read is never removed on its behalf.
    #[tracing::instrument(skip(self, expected))]
    pub async fn consume(
        &self,
        subject_id: &str,
        ceremony: CeremonyType,
        expected: &str,
    ) -> Result<bool, PasskeyError> {
        let key = Self::key(subject_id, ceremony);
        let Some(data) = self.cache.get(CHALLENGE_PREFIX, &key).await? else {
            tracing::debug!("Challenge already gone");
            return Ok(false);
        };

        let stored: StoredChallenge = serde_json::from_str(&data.value)?;
        let matches: bool = stored
            .challenge
            .as_bytes()
            .ct_eq(expected.as_bytes())
            .into();
        if !matches {
            tracing::debug!("Challenge was replaced");
            return Ok(false);
        }

        let removed = self
            .cache
            .remove_if_equal(CHALLENGE_PREFIX, &key, &data)
            .await?;
        tracing::debug!(removed, "Challenge consumed");
        Ok(removed)
    }
}
