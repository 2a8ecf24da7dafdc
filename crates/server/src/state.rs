use std::sync::Arc;

use tubefetch_core::{
    ArtifactRegistry, Config, Dispatcher, DownloadPanelView, JobManager, SanitizedConfig,
    SessionRegistry, VideoSearch,
};

/// Shared application state
pub struct AppState {
    config: Config,
    dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Wire the registries, job manager and dispatcher for `config`.
    pub fn new(config: Config, search: Arc<dyn VideoSearch>) -> Self {
        let sessions = SessionRegistry::new();
        let artifacts =
            ArtifactRegistry::new(config.downloads.dir.clone(), config.downloads.artifact_ttl());
        let jobs = Arc::new(JobManager::new(
            config.tool.clone(),
            artifacts,
            sessions.clone(),
            Arc::new(DownloadPanelView),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            config.site.clone(),
            search,
            jobs,
            sessions,
            config.pagination.ttl(),
        ));

        Self { config, dispatcher }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn sessions(&self) -> &SessionRegistry {
        self.dispatcher.sessions()
    }

    pub fn jobs(&self) -> &Arc<JobManager> {
        self.dispatcher.jobs()
    }

    pub fn artifacts(&self) -> &ArtifactRegistry {
        self.dispatcher.jobs().artifacts()
    }
}
