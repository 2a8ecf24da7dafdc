//! Download jobs: tool output parsing and process supervision.

mod error;
mod manager;
mod parser;
mod traits;
mod types;

pub use error::JobError;
pub use manager::{is_valid_target, JobManager, JobRequest};
pub use parser::{parse_format_line, parse_formats, ProgressParser, PROGRESS_PREFIX};
pub use traits::{JobContext, JobView};
pub use types::{
    fallback_formats, Format, FormatRemark, Job, JobFailure, JobStart, JobStatus,
    STREAMING_MARKER,
};

/// Element replaced by the final download panel.
pub const DOWNLOAD_PANEL_SELECTOR: &str = "#downloadPage";

/// Element whose text tracks the latest progress line.
pub const PROGRESS_SELECTOR: &str = "#downloadProgress";
