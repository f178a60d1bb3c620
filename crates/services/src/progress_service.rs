use std::sync::{Arc, Mutex, PoisonError};

use storage::cache::SessionCache;
use storage::repository::ProgressRepository;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use tutor_core::model::{LearnerProfile, UserProgress};

/// Loads and saves learner progress.
///
/// The store is authoritative. The local cache is written on every change
/// and read only when the store cannot be reached. Store writes run on one
/// background task, in the order they were submitted.
#[derive(Clone)]
pub struct ProgressService {
    store: Arc<dyn ProgressRepository>,
    cache: Arc<dyn SessionCache>,
    writes: Arc<Mutex<Option<mpsc::UnboundedSender<WriteJob>>>>,
}

enum WriteJob {
    Save { email: String, progress: UserProgress },
    Flush(oneshot::Sender<()>),
}

impl ProgressService {
    #[must_use]
    pub fn new(store: Arc<dyn ProgressRepository>, cache: Arc<dyn SessionCache>) -> Self {
        Self {
            store,
            cache,
            writes: Arc::new(Mutex::new(None)),
        }
    }

    /// Progress to start a session with.
    ///
    /// Never fails: a missing record, or an unreachable store without a
    /// cached record for this learner, yields zeroed progress.
    pub async fn load(&self, email: Option<&str>) -> UserProgress {
        let Some(email) = email else {
            return self.cached_for(None).unwrap_or_default();
        };

        match self.store.get_progress(email).await {
            Ok(Some(progress)) => {
                self.write_cache(&progress);
                progress
            }
            Ok(None) => {
                debug!(email, "no stored progress, starting fresh");
                UserProgress::new()
            }
            Err(err) => {
                warn!(email, error = %err, "progress read failed, falling back to local cache");
                self.cached_for(Some(email)).unwrap_or_default()
            }
        }
    }

    /// Record a sign-in locally and return the progress to start with.
    pub async fn login(&self, token: Option<String>, user: &LearnerProfile) -> UserProgress {
        let progress = self.load(user.email()).await;
        if let Err(err) = self.cache.store_login(token, user, &progress) {
            warn!(error = %err, "failed to cache login");
        }
        progress
    }

    /// Resume the cached session, if a learner is cached.
    #[must_use]
    pub fn resume(&self) -> Option<(LearnerProfile, UserProgress)> {
        let session = match self.cache.load() {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "session cache unreadable");
                return None;
            }
        };
        let user = session.user?;
        Some((user, session.progress.unwrap_or_default()))
    }

    /// Clear everything cached for the signed-in learner.
    pub fn logout(&self) {
        if let Err(err) = self.cache.clear() {
            warn!(error = %err, "failed to clear session cache");
        }
    }

    /// Cache `progress` now and queue a store write behind earlier ones.
    ///
    /// Learners without an email are only cached. A failed write is logged
    /// and otherwise ignored.
    pub fn persist(&self, email: Option<&str>, progress: &UserProgress) {
        self.write_cache(progress);

        let Some(email) = email else {
            return;
        };
        self.enqueue(WriteJob::Save {
            email: email.to_owned(),
            progress: progress.clone(),
        });
    }

    /// Wait until every write queued so far has reached the store.
    pub async fn flush(&self) {
        let (done, finished) = oneshot::channel();
        let queued = {
            let guard = self.writes.lock().unwrap_or_else(PoisonError::into_inner);
            guard
                .as_ref()
                .is_some_and(|sender| sender.send(WriteJob::Flush(done)).is_ok())
        };
        if queued && finished.await.is_err() {
            warn!("progress writer stopped before flushing");
        }
    }

    fn enqueue(&self, job: WriteJob) {
        let mut guard = self.writes.lock().unwrap_or_else(PoisonError::into_inner);
        let job = match guard.as_ref() {
            Some(sender) => match sender.send(job) {
                Ok(()) => return,
                Err(mpsc::error::SendError(job)) => job,
            },
            None => job,
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(Arc::clone(&self.store), receiver));
        if sender.send(job).is_err() {
            warn!("progress writer unavailable, write dropped");
        }
        *guard = Some(sender);
    }

    /// Cached progress, but only if it was cached for the learner with
    /// `email`.
    fn cached_for(&self, email: Option<&str>) -> Option<UserProgress> {
        let session = match self.cache.load() {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "session cache unreadable");
                return None;
            }
        };
        let cached_email = session.user.as_ref().and_then(LearnerProfile::email);
        let same_learner = match (cached_email, email) {
            (Some(cached), Some(email)) => cached.eq_ignore_ascii_case(email),
            (None, None) => true,
            _ => false,
        };
        if !same_learner {
            debug!("cached progress belongs to another learner, ignoring it");
            return None;
        }
        session.progress
    }

    fn write_cache(&self, progress: &UserProgress) {
        if let Err(err) = self.cache.store_progress(progress) {
            warn!(error = %err, "failed to cache progress");
        }
    }
}

async fn run_writer(
    store: Arc<dyn ProgressRepository>,
    mut jobs: mpsc::UnboundedReceiver<WriteJob>,
) {
    while let Some(job) = jobs.recv().await {
        match job {
            WriteJob::Save { email, progress } => {
                match store.save_progress(&email, &progress).await {
                    Ok(()) => {
                        debug!(email = %email, total_points = progress.total_points(), "progress saved");
                    }
                    Err(err) => warn!(email = %email, error = %err, "progress write failed"),
                }
            }
            WriteJob::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use storage::cache::InMemorySessionCache;
    use storage::repository::{InMemoryRepository, StorageError};
    use tutor_core::ledger::record_challenge_accepted;
    use tutor_core::model::UserId;
    use tutor_core::time::fixed_now;

    struct Unreachable;

    #[async_trait]
    impl ProgressRepository for Unreachable {
        async fn get_progress(&self, _email: &str) -> Result<Option<UserProgress>, StorageError> {
            Err(StorageError::Connection("refused".into()))
        }

        async fn save_progress(
            &self,
            _email: &str,
            _progress: &UserProgress,
        ) -> Result<(), StorageError> {
            Err(StorageError::Connection("refused".into()))
        }
    }

    fn learner() -> LearnerProfile {
        LearnerProfile::new(
            UserId::new("u1"),
            "Anu",
            Some("anu@example.com".into()),
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn store_wins_over_cache() {
        let repo = Arc::new(InMemoryRepository::new());
        let cache = Arc::new(InMemorySessionCache::new());
        let stored = record_challenge_accepted(&UserProgress::new());
        repo.save_progress("anu@example.com", &stored).await.unwrap();
        cache.store_progress(&UserProgress::new()).unwrap();

        let service = ProgressService::new(repo, cache.clone());
        assert_eq!(service.load(Some("anu@example.com")).await, stored);
        assert_eq!(cache.load().unwrap().progress, Some(stored));
    }

    #[tokio::test]
    async fn missing_record_is_fresh_progress_even_with_a_cache() {
        let cache = Arc::new(InMemorySessionCache::new());
        cache
            .store_progress(&record_challenge_accepted(&UserProgress::new()))
            .unwrap();
        let service = ProgressService::new(Arc::new(InMemoryRepository::new()), cache);
        assert_eq!(
            service.load(Some("anu@example.com")).await,
            UserProgress::new()
        );
    }

    #[tokio::test]
    async fn cache_is_used_when_store_is_unreachable() {
        let cache = Arc::new(InMemorySessionCache::new());
        let cached = record_challenge_accepted(&UserProgress::new());
        cache.store_login(None, &learner(), &cached).unwrap();

        let service = ProgressService::new(Arc::new(Unreachable), cache);
        assert_eq!(service.load(Some("ANU@example.com")).await, cached);
    }

    #[tokio::test]
    async fn another_learners_cache_is_not_used() {
        let cache = Arc::new(InMemorySessionCache::new());
        cache
            .store_login(None, &learner(), &record_challenge_accepted(&UserProgress::new()))
            .unwrap();

        let service = ProgressService::new(Arc::new(Unreachable), cache);
        assert_eq!(
            service.load(Some("mia@example.com")).await,
            UserProgress::new()
        );
        assert_eq!(service.load(None).await, UserProgress::new());
    }

    #[tokio::test]
    async fn failed_write_keeps_the_cache_updated() {
        let cache = Arc::new(InMemorySessionCache::new());
        let service = ProgressService::new(Arc::new(Unreachable), cache.clone());
        let progress = record_challenge_accepted(&UserProgress::new());

        service.persist(Some("anu@example.com"), &progress);
        service.flush().await;
        assert_eq!(cache.load().unwrap().progress, Some(progress));
    }

    #[tokio::test]
    async fn login_resume_and_logout() {
        let service = ProgressService::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemorySessionCache::new()),
        );
        assert!(service.resume().is_none());

        let progress = service.login(Some("token".into()), &learner()).await;
        let (user, resumed) = service.resume().unwrap();
        assert_eq!(user, learner());
        assert_eq!(resumed, progress);

        service.logout();
        assert!(service.resume().is_none());
    }
}
