//! Parsers for the extraction tool's stdout.
//!
//! Neither parser ever fails: rows that do not fit the expected shape are
//! skipped, and the caller decides what an empty result means.

use super::types::{Format, FormatRemark, STREAMING_MARKER};

/// Prefix of the tool's download progress lines.
pub const PROGRESS_PREFIX: &str = "[download]";

const SEPARATOR_PREFIX: &str = "-----";
const THUMBNAIL_EXT: &str = "mhtml";

/// Parse a `-F` format listing into descriptors, in listing order.
///
/// Returns an empty list when the separator line is missing.
pub fn parse_formats(text: &str) -> Vec<Format> {
    let mut lines = text.lines();
    if !lines.any(|line| line.trim_start().starts_with(SEPARATOR_PREFIX)) {
        return Vec::new();
    }

    lines
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_format_line)
        .filter(|format| !format.file_size.is_empty() && format.ext != THUMBNAIL_EXT)
        .collect()
}

/// Parse one table row such as `22 mp4 1280x720 30 | 45.2MiB 1.2Mbps https`.
pub fn parse_format_line(line: &str) -> Option<Format> {
    let line = line
        .replace("audio only", "audio_only")
        .replace("video only", "video_only");

    let groups: Vec<Vec<&str>> = line
        .split('|')
        .map(|group| group.split_whitespace().collect::<Vec<_>>())
        .filter(|tokens| !tokens.is_empty())
        .collect();

    let head = groups.first()?;
    let id = head.first()?;
    let ext = head.get(1)?;

    let resolution = match head.get(2) {
        Some(&"audio_only") | None => "",
        Some(value) => *value,
    };
    let fps = head.get(3).copied().unwrap_or("");

    let size_group = groups.get(1)?;
    let mut file_size = size_group.first()?.to_string();
    if file_size == "~" || file_size == "≈" {
        if let Some(next) = size_group.get(1) {
            file_size.push_str(next);
        }
    } else if file_size == "m3u8" {
        file_size = STREAMING_MARKER.to_string();
    }

    let remark = if line.contains("audio_only") {
        FormatRemark::AudioOnly
    } else if line.contains("video_only") {
        FormatRemark::VideoOnly
    } else {
        FormatRemark::None
    };

    Some(Format {
        id: id.to_string(),
        ext: ext.to_string(),
        resolution: resolution.to_string(),
        fps: fps.to_string(),
        file_size,
        remark,
    })
}

/// Incremental splitter for the download process's stdout.
///
/// The tool rewrites its progress line with carriage returns, so both `\r`
/// and `\n` end a line. Bytes are held undecoded until their line is
/// complete, so a character split across two reads survives intact.
#[derive(Debug, Default)]
pub struct ProgressParser {
    pending: Vec<u8>,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one stdout chunk and return the progress lines it completed.
    pub fn feed(&mut self, chunk: impl AsRef<[u8]>) -> Vec<String> {
        self.pending.extend_from_slice(chunk.as_ref());

        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\r' || b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(event) = progress_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        progress_line(&rest)
    }
}

fn progress_line(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    line.starts_with(PROGRESS_PREFIX).then(|| line.to_string())
}
