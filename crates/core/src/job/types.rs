//! Types shared by the job parser and manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker used for formats only offered as a streaming manifest.
pub const STREAMING_MARKER: &str = "(streaming)";

/// What kind of stream a format carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FormatRemark {
    #[default]
    None,
    AudioOnly,
    VideoOnly,
}

impl FormatRemark {
    pub fn label(&self) -> &'static str {
        match self {
            FormatRemark::None => "",
            FormatRemark::AudioOnly => "audio only",
            FormatRemark::VideoOnly => "video only",
        }
    }
}

/// One row of the tool's format listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    pub id: String,
    pub ext: String,
    /// Empty for audio-only rows.
    pub resolution: String,
    /// Frame rate, or channel count for audio rows.
    pub fps: String,
    /// Size token, `~`/`≈`-prefixed estimate, or [`STREAMING_MARKER`].
    pub file_size: String,
    pub remark: FormatRemark,
}

impl Format {
    pub fn is_streaming(&self) -> bool {
        self.file_size == STREAMING_MARKER
    }
}

/// Lifecycle of a download job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

/// Snapshot of a job as seen by callers of the manager.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub target: String,
    pub format_id: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    /// URLs whose viewers are notified about this job.
    pub watch_urls: Vec<String>,
}

/// Result of asking the manager for a download.
#[derive(Debug, Clone)]
pub enum JobStart {
    /// A finished file already exists; nothing was spawned.
    Cached { filename: String },
    /// A new process was spawned.
    Spawned(Job),
    /// A job for the same target was already running; the caller was attached to it.
    Attached(Job),
}

impl JobStart {
    pub fn filename(&self) -> Option<&str> {
        match self {
            JobStart::Cached { filename } => Some(filename),
            _ => None,
        }
    }
}

/// Why a job ended without a usable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    ExitCode(Option<i32>),
    MissingOutput,
    Io(String),
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobFailure::ExitCode(Some(code)) => write!(f, "downloader exited with code {}", code),
            JobFailure::ExitCode(None) => write!(f, "downloader was terminated by a signal"),
            JobFailure::MissingOutput => write!(f, "downloader finished but no file was found"),
            JobFailure::Io(reason) => write!(f, "I/O error while downloading: {}", reason),
        }
    }
}

/// Static table offered when the format listing cannot be parsed.
pub fn fallback_formats() -> Vec<Format> {
    const ROWS: &[(&str, &str, &str, &str, &str, FormatRemark)] = &[
        ("233", "mp4", "", "", STREAMING_MARKER, FormatRemark::AudioOnly),
        ("234", "mp4", "", "", STREAMING_MARKER, FormatRemark::AudioOnly),
        ("139", "m4a", "", "2", "", FormatRemark::AudioOnly),
        ("140", "m4a", "", "2", "", FormatRemark::AudioOnly),
        ("251", "webm", "", "2", "", FormatRemark::AudioOnly),
        ("269", "mp4", "256x144", "24", "", FormatRemark::VideoOnly),
        ("160", "mp4", "256x144", "24", "", FormatRemark::VideoOnly),
        ("230", "mp4", "640x360", "24", "", FormatRemark::VideoOnly),
        ("134", "mp4", "640x360", "24", "", FormatRemark::VideoOnly),
        ("18", "mp4", "640x360", "24", "", FormatRemark::None),
        ("605", "mp4", "640x360", "24", "", FormatRemark::VideoOnly),
        ("232", "mp4", "1280x720", "24", "", FormatRemark::VideoOnly),
        ("136", "mp4", "1280x720", "24", "", FormatRemark::VideoOnly),
    ];

    ROWS.iter()
        .map(|(id, ext, resolution, fps, file_size, remark)| Format {
            id: id.to_string(),
            ext: ext.to_string(),
            resolution: resolution.to_string(),
            fps: fps.to_string(),
            file_size: file_size.to_string(),
            remark: *remark,
        })
        .collect()
}
