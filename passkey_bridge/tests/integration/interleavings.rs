use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

use passkey_bridge::{
    CacheData, CacheStore, CeremonyType, CoordinationError, CredentialRecord, InMemoryCacheStore,
    InMemorySubjectStore, StorageError, Subject, SubjectStore, UserError,
};

use crate::common::{
    SoftAuthenticator, StaticTokenProvider, challenge_of, config, setup_with_stores,
    verify_request,
};

const EMAIL: &str = "carol@example.com";

/// Cache that, once armed, parks the next compare-and-delete until released.
struct GatedCache {
    inner: InMemoryCacheStore,
    armed: AtomicBool,
    reached: Notify,
    release: Notify,
}

impl GatedCache {
    fn new() -> Self {
        Self {
            inner: InMemoryCacheStore::new(),
            armed: AtomicBool::new(false),
            reached: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl CacheStore for GatedCache {
    async fn init(&self) -> Result<(), StorageError> {
        self.inner.init().await
    }

    async fn put_with_ttl(
        &self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: u64,
    ) -> Result<(), StorageError> {
        self.inner.put_with_ttl(prefix, key, value, ttl).await
    }

    async fn get(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError> {
        self.inner.get(prefix, key).await
    }

    async fn remove(&self, prefix: &str, key: &str) -> Result<bool, StorageError> {
        self.inner.remove(prefix, key).await
    }

    async fn remove_if_equal(
        &self,
        prefix: &str,
        key: &str,
        expected: &CacheData,
    ) -> Result<bool, StorageError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        self.inner.remove_if_equal(prefix, key, expected).await
    }
}

/// Subject store whose lookups by id start failing once `vanish` is set.
#[derive(Default)]
struct VanishingSubjectStore {
    inner: InMemorySubjectStore,
    vanish: AtomicBool,
}

#[async_trait]
impl SubjectStore for VanishingSubjectStore {
    async fn init(&self) -> Result<(), UserError> {
        self.inner.init().await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Subject>, UserError> {
        if self.vanish.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.get_by_id(id).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Subject>, UserError> {
        self.inner.get_by_email(email).await
    }

    async fn create(&self, subject: Subject) -> Result<Subject, UserError> {
        self.inner.create(subject).await
    }

    async fn update_credentials(
        &self,
        id: &str,
        credentials: &[CredentialRecord],
    ) -> Result<(), UserError> {
        self.inner.update_credentials(id, credentials).await
    }
}

#[tokio::test]
async fn test_stalled_verify_cannot_consume_a_reissued_challenge() {
    // Given a registered subject with an outstanding authentication challenge
    let cache = Arc::new(GatedCache::new());
    let subjects = Arc::new(InMemorySubjectStore::new());
    let tokens = Arc::new(StaticTokenProvider::default());
    let orchestrator =
        setup_with_stores(config(), cache.clone(), subjects.clone(), tokens.clone());
    let authenticator = SoftAuthenticator::new();

    let init = orchestrator.initiate(EMAIL).await.unwrap();
    let response = authenticator.register(&challenge_of(&init));
    orchestrator
        .verify(verify_request(&init, EMAIL, response))
        .await
        .unwrap();
    let user_id = init.user_id;

    let init = orchestrator.initiate(EMAIL).await.unwrap();
    assert_eq!(init.ceremony_type, CeremonyType::Authentication);
    let challenge = challenge_of(&init);
    let stalled_response = authenticator.assert(&challenge, 2, &user_id);
    let winning_response = authenticator.assert(&challenge, 1, &user_id);

    // When one verify stalls right before deleting the challenge
    cache.armed.store(true, Ordering::SeqCst);
    let stalled = {
        let orchestrator = orchestrator.clone();
        let request = verify_request(&init, EMAIL, stalled_response);
        tokio::spawn(async move { orchestrator.verify(request).await })
    };
    cache.reached.notified().await;

    // And another verify of the same challenge completes
    orchestrator
        .verify(verify_request(&init, EMAIL, winning_response))
        .await
        .unwrap();

    // And a new challenge is issued for the same subject before the stalled one resumes
    let reissued = orchestrator.initiate(EMAIL).await.unwrap();
    cache.release.notify_one();
    let result = stalled.await.unwrap();

    // Then the stalled verify fails and leaves the new challenge alone
    assert!(matches!(
        result,
        Err(CoordinationError::ChallengeExpiredOrMissing)
    ));
    assert_eq!(tokens.emails.lock().unwrap().len(), 2);

    let subject = subjects.get_by_id(&user_id).await.unwrap().unwrap();
    assert_eq!(subject.credentials[0].counter, 1);

    let fresh_response = authenticator.assert(&challenge_of(&reissued), 3, &user_id);
    orchestrator
        .verify(verify_request(&reissued, EMAIL, fresh_response))
        .await
        .unwrap();
    assert_eq!(tokens.emails.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_subject_removed_between_initiate_and_verify() {
    // Given a registration ceremony for a new subject
    let subjects = Arc::new(VanishingSubjectStore::default());
    let tokens = Arc::new(StaticTokenProvider::default());
    let orchestrator = setup_with_stores(
        config(),
        Arc::new(InMemoryCacheStore::new()),
        subjects.clone(),
        tokens.clone(),
    );
    let authenticator = SoftAuthenticator::new();
    let init = orchestrator.initiate(EMAIL).await.unwrap();
    let response = authenticator.register(&challenge_of(&init));

    // When the subject disappears before the response comes back
    subjects.vanish.store(true, Ordering::SeqCst);
    let result = orchestrator
        .verify(verify_request(&init, EMAIL, response.clone()))
        .await;

    // Then the verify reports the missing subject and no tokens are issued
    assert!(matches!(
        result,
        Err(CoordinationError::SubjectNotFound(id)) if id == init.user_id
    ));
    assert!(tokens.emails.lock().unwrap().is_empty());

    // And the challenge was not spent, so the ceremony completes once the subject is back
    subjects.vanish.store(false, Ordering::SeqCst);
    orchestrator
        .verify(verify_request(&init, EMAIL, response))
        .await
        .unwrap();
    assert_eq!(tokens.emails.lock().unwrap().len(), 1);
}
