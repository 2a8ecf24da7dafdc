//! Lifetime tracking for files in the shared download directory.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use super::{EvictionHandler, ExpiringCache};

/// Suffixes the extraction tool uses for files that are still being written.
const IN_PROGRESS_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp"];

/// Single-stream intermediates of a merged format, e.g. `Title [id].f137.mp4`.
static FORMAT_INTERMEDIATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.f\d+\.[A-Za-z0-9]+$").unwrap());

/// Deletes an artifact from disk once its TTL lapses.
pub struct ArtifactEvictor;

#[async_trait]
impl EvictionHandler<String, PathBuf> for ArtifactEvictor {
    async fn on_evict(&self, filename: &String, path: &PathBuf) -> anyhow::Result<()> {
        tokio::fs::remove_file(path).await?;
        info!("Deleted expired artifact {}", filename);
        Ok(())
    }
}

/// Filename-keyed eviction registry over the download directory.
///
/// Every reference to a file should go through [`ArtifactRegistry::retain`]
/// before the file is advertised, otherwise deletion can race the reader.
#[derive(Debug, Clone)]
pub struct ArtifactRegistry {
    dir: PathBuf,
    ttl: Duration,
    cache: ExpiringCache<String, PathBuf>,
}

impl ArtifactRegistry {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        let evictor: Arc<dyn EvictionHandler<String, PathBuf>> = Arc::new(ArtifactEvictor);
        Self {
            dir: dir.into(),
            ttl,
            cache: ExpiringCache::with_handler("artifacts", evictor),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Register `filename` or restart its TTL if already tracked.
    pub fn retain(&self, filename: &str) {
        if !self.cache.touch(&filename.to_string()) {
            self.cache
                .put(filename.to_string(), self.dir.join(filename), self.ttl);
        }
    }

    /// Stop tracking `filename` without deleting it.
    pub fn forget(&self, filename: &str) -> bool {
        self.cache.remove(&filename.to_string()).is_some()
    }

    pub fn is_tracked(&self, filename: &str) -> bool {
        self.cache.contains_key(&filename.to_string())
    }

    /// When `filename` is due for deletion.
    pub fn expires_at(&self, filename: &str) -> Option<Instant> {
        self.cache.expires_at(&filename.to_string())
    }

    pub fn tracked_count(&self) -> usize {
        self.cache.len()
    }

    /// Find a finished file whose name contains `target`.
    ///
    /// A missing or unreadable directory counts as "no file".
    pub async fn find_by_target(&self, target: &str) -> Option<String> {
        if target.is_empty() {
            return None;
        }
        let mut matches: Vec<String> = self
            .list_files()
            .await
            .into_iter()
            .filter(|name| name.contains(target) && !is_in_progress(name))
            .collect();
        matches.sort();
        matches.into_iter().next()
    }

    /// Register every file already present in the directory.
    pub async fn scan_existing(&self) -> usize {
        let files = self.list_files().await;
        for name in &files {
            self.retain(name);
        }
        files.len()
    }

    async fn list_files(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read download directory {:?}: {}", self.dir, e);
                return names;
            }
        };

        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let is_file = entry
                        .file_type()
                        .await
                        .map(|t| t.is_file())
                        .unwrap_or(false);
                    if is_file {
                        names.push(entry.file_name().to_string_lossy().into_owned());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Error while listing {:?}: {}", self.dir, e);
                    break;
                }
            }
        }
        names
    }
}

fn is_in_progress(name: &str) -> bool {
    IN_PROGRESS_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
        || name.contains(".part-Frag")
        || FORMAT_INTERMEDIATE.is_match(name)
}
