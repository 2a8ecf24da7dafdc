//! Scripted stand-in for the extraction tool.
//!
//! Writes a small shell script that answers `-F <url>` with a canned listing
//! and `-f <format> <url>` with progress lines, then optionally creates
//! `Video [<id>].mp4` in its working directory.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Listing with two downloadable rows and one streaming row.
pub const SAMPLE_LISTING: &str = "\
[info] Available formats for abc:
ID  EXT   RESOLUTION FPS CH |   FILESIZE   TBR PROTO | VCODEC        VBR ACODEC      ABR ASR MORE INFO
---------------------------------------------------------------------------------------------------------
sb0 mhtml 48x27        0    |                  mhtml | images                                    storyboard
233 mp4   audio only        |                  m3u8  | audio only        unknown             Default
140 m4a   audio only      2 |    3.27MiB  129k https | audio only        mp4a.40.2  129k 44k medium, m4a_dash
18  mp4   640x360     30  2 | ~  8.51MiB  336k https | avc1.42001E         mp4a.40.2        44k 360p
";

#[derive(Debug, Clone)]
pub struct FakeTool {
    dir: PathBuf,
    listing: String,
    exit_code: i32,
    writes_file: bool,
    gate: Option<PathBuf>,
    extra_line: Option<String>,
}

impl FakeTool {
    /// A tool that succeeds and writes its output file. `dir` holds the script.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            listing: SAMPLE_LISTING.to_string(),
            exit_code: 0,
            writes_file: true,
            gate: None,
            extra_line: None,
        }
    }

    pub fn listing(mut self, listing: impl Into<String>) -> Self {
        self.listing = listing.into();
        if !self.listing.ends_with('\n') {
            self.listing.push('\n');
        }
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Exit without producing a file.
    pub fn without_output(mut self) -> Self {
        self.writes_file = false;
        self
    }

    /// Print `line` right after the first progress line.
    pub fn announce(mut self, line: impl Into<String>) -> Self {
        self.extra_line = Some(line.into());
        self
    }

    /// Pause after the first progress line until `path` exists.
    pub fn gated_by(mut self, path: impl Into<PathBuf>) -> Self {
        self.gate = Some(path.into());
        self
    }

    /// Write the script and return its path.
    pub fn install(&self) -> io::Result<PathBuf> {
        let path = self.dir.join("fake-yt-dlp");
        std::fs::write(&path, self.script())?;
        let mut permissions = std::fs::metadata(&path)?.permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(&path, permissions)?;
        Ok(path)
    }

    fn script(&self) -> String {
        let gate = match &self.gate {
            Some(path) => format!(
                "while [ ! -f '{}' ]; do sleep 0.02; done\n",
                shell_path(path)
            ),
            None => String::new(),
        };
        let extra = match &self.extra_line {
            Some(line) => format!("printf '%s\\n' '{}'\n", shell_quote(line)),
            None => String::new(),
        };
        let write = if self.writes_file {
            "printf 'data' > \"Video [$id].mp4\"\n"
        } else {
            ""
        };

        format!(
            "#!/bin/sh\n\
             if [ \"$1\" = \"-F\" ]; then\n\
             cat <<'LISTING'\n{listing}LISTING\n\
             exit 0\n\
             fi\n\
             url=\"$3\"\n\
             id=\"${{url##*=}}\"\n\
             printf '[youtube] Extracting URL: %s\\n' \"$url\"\n\
             printf '[download]   1.0%% of 1.00MiB\\r'\n\
             {extra}\
             {gate}\
             printf '[download] 100%% of 1.00MiB\\n'\n\
             {write}\
             exit {code}\n",
            listing = self.listing,
            extra = extra,
            gate = gate,
            write = write,
            code = self.exit_code,
        )
    }
}

fn shell_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}

fn shell_quote(value: &str) -> String {
    value.replace('\'', "'\\''")
}
