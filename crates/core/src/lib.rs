pub mod app;
pub mod cache;
pub mod config;
pub mod job;
pub mod metrics;
pub mod protocol;
pub mod render;
pub mod search;
pub mod session;
pub mod testing;

pub use app::{Dispatcher, DownloadPanelView, PageRoute, Route};
pub use cache::{ArtifactRegistry, EvictionHandler, ExpiringCache};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use job::{Format, Job, JobError, JobManager, JobRequest, JobStart, JobStatus, JobView};
pub use protocol::{ClientMessage, ProtocolError, ServerMessage};
pub use render::{DocumentShell, HtmlSink, Node, RenderContext, RenderError, Transport};
pub use search::{InnertubeClient, SearchError, VideoDetail, VideoSearch};
pub use session::{SessionId, SessionRegistry};
