use std::sync::Arc;

use storage::cache::{FileSessionCache, SessionCache};
use storage::repository::{ProgressRepository, Storage};
use tracing::info;

use crate::Clock;
use crate::collaborators::{Collaborators, HttpTutorApi};
use crate::config::TutorConfig;
use crate::error::AppServicesError;
use crate::family_service::FamilyService;
use crate::learner_service::LearnerService;
use crate::progress_service::ProgressService;
use crate::session::{SessionController, SessionSettings};

/// Assembles app-facing services from a `TutorConfig`.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    settings: SessionSettings,
    collaborators: Collaborators,
    progress: ProgressService,
    learners: Arc<LearnerService>,
    families: Arc<FamilyService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and, when an API URL is
    /// configured, the remote tutor backend.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the HTTP
    /// client cannot be built.
    pub async fn new(config: &TutorConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        let cache: Arc<dyn SessionCache> = Arc::new(FileSessionCache::new(&config.cache_path));

        let (collaborators, progress_store): (Collaborators, Arc<dyn ProgressRepository>) =
            match &config.api_url {
                Some(url) => {
                    let api = HttpTutorApi::new(url.clone(), config.http_timeout)?;
                    info!(api = %url, "using remote tutor backend");
                    (Collaborators::http(api.clone()), Arc::new(api))
                }
                None => {
                    info!(db = %config.db_url, "no backend configured, running offline");
                    (Collaborators::offline(), Arc::clone(&storage.progress))
                }
            };

        Ok(Self::from_parts(
            clock,
            SessionSettings {
                language: config.language,
                feedback_dwell: config.feedback_dwell,
            },
            collaborators,
            storage,
            progress_store,
            cache,
        ))
    }

    /// Wire services from already-built parts.
    #[must_use]
    pub fn from_parts(
        clock: Clock,
        settings: SessionSettings,
        collaborators: Collaborators,
        storage: Storage,
        progress_store: Arc<dyn ProgressRepository>,
        cache: Arc<dyn SessionCache>,
    ) -> Self {
        let progress = ProgressService::new(progress_store, cache);
        let learners = Arc::new(LearnerService::new(clock, Arc::clone(&storage.users)));
        let families = Arc::new(FamilyService::new(
            clock,
            Arc::clone(&storage.families),
            Arc::clone(&storage.users),
            Arc::clone(&storage.progress),
        ));
        Self {
            clock,
            settings,
            collaborators,
            progress,
            learners,
            families,
        }
    }

    /// A fresh session for one learner.
    #[must_use]
    pub fn session(&self) -> SessionController {
        SessionController::new(
            self.clock,
            self.collaborators.clone(),
            self.progress.clone(),
            self.settings,
        )
    }

    #[must_use]
    pub fn learners(&self) -> Arc<LearnerService> {
        Arc::clone(&self.learners)
    }

    #[must_use]
    pub fn families(&self) -> Arc<FamilyService> {
        Arc::clone(&self.families)
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressService {
        &self.progress
    }
}
