//! Spawns and supervises download processes.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

use super::error::JobError;
use super::parser::{parse_formats, ProgressParser};
use super::traits::{JobContext, JobView};
use super::types::{fallback_formats, Format, Job, JobFailure, JobStart, JobStatus};
use super::{DOWNLOAD_PANEL_SELECTOR, PROGRESS_SELECTOR};
use crate::cache::ArtifactRegistry;
use crate::config::ToolConfig;
use crate::metrics::{
    EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS, FORMAT_FALLBACKS, JOBS_DEDUPLICATED,
    JOBS_FINISHED, JOBS_RUNNING, JOBS_STARTED, JOB_DURATION, PROGRESS_EVENTS,
};
use crate::protocol::ServerMessage;
use crate::render::{to_patch_guarded, Node, RenderContext, Transport};
use crate::search::VideoDetail;
use crate::session::SessionRegistry;

/// A download request from a page.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub target: String,
    pub format_id: String,
    /// URL of the page that asked; its viewers are notified.
    pub current_url: String,
    pub detail: VideoDetail,
}

struct InFlight {
    job: Job,
    context: JobContext,
}

/// Owner of every download process.
///
/// At most one process runs per target. A request for a target that is
/// already downloading attaches its URL to the running job instead.
pub struct JobManager {
    tool: ToolConfig,
    artifacts: ArtifactRegistry,
    sessions: SessionRegistry,
    view: Arc<dyn JobView>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    /// Raw `-F` output by media URL.
    format_cache: Mutex<HashMap<String, String>>,
}

impl JobManager {
    pub fn new(
        tool: ToolConfig,
        artifacts: ArtifactRegistry,
        sessions: SessionRegistry,
        view: Arc<dyn JobView>,
    ) -> Self {
        Self {
            tool,
            artifacts,
            sessions,
            view,
            in_flight: Mutex::new(HashMap::new()),
            format_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn artifacts(&self) -> &ArtifactRegistry {
        &self.artifacts
    }

    /// Start a download, reuse a finished file, or join a running job.
    pub async fn start(self: &Arc<Self>, request: JobRequest) -> Result<JobStart, JobError> {
        if !is_valid_target(&request.target) {
            return Err(JobError::InvalidTarget(request.target));
        }

        // A running job may already have left intermediate files on disk,
        // so it wins over the directory scan.
        if let Some(job) = self.attach(&request) {
            return Ok(JobStart::Attached(job));
        }

        if let Some(filename) = self.artifacts.find_by_target(&request.target).await {
            self.artifacts.retain(&filename);
            JOBS_DEDUPLICATED.with_label_values(&["cached"]).inc();
            debug!(video = %request.target, %filename, "Download already available");
            return Ok(JobStart::Cached { filename });
        }

        // Reserve the target before spawning so concurrent requests attach.
        let job = {
            let mut in_flight = self.in_flight.lock().unwrap();
            if let Some(running) = in_flight.get_mut(&request.target) {
                return Ok(JobStart::Attached(attach_url(running, &request)));
            }

            let job = Job {
                target: request.target.clone(),
                format_id: request.format_id.clone(),
                status: JobStatus::Running,
                started_at: Utc::now(),
                watch_urls: vec![request.current_url.clone()],
            };
            let context = JobContext {
                target: request.target.clone(),
                format_id: request.format_id.clone(),
                detail: request.detail.clone(),
            };
            in_flight.insert(
                request.target.clone(),
                InFlight {
                    job: job.clone(),
                    context,
                },
            );
            job
        };

        let child = match self.spawn_download(&request) {
            Ok(child) => child,
            Err(e) => {
                self.in_flight.lock().unwrap().remove(&request.target);
                error!(video = %request.target, "Failed to spawn download: {}", e);
                return Err(e);
            }
        };

        JOBS_STARTED.inc();
        JOBS_RUNNING.inc();
        info!(
            video = %request.target,
            format = %request.format_id,
            "Download started"
        );

        let manager = Arc::clone(self);
        let target = request.target.clone();
        tokio::spawn(async move {
            manager.supervise(target, child).await;
        });

        Ok(JobStart::Spawned(job))
    }

    fn attach(&self, request: &JobRequest) -> Option<Job> {
        let mut in_flight = self.in_flight.lock().unwrap();
        let job = in_flight
            .get_mut(&request.target)
            .map(|running| attach_url(running, request));
        job
    }

    /// Snapshot of a running job.
    pub fn job(&self, target: &str) -> Option<Job> {
        self.in_flight
            .lock()
            .unwrap()
            .get(target)
            .map(|running| running.job.clone())
    }

    pub fn running_jobs(&self) -> Vec<Job> {
        self.in_flight
            .lock()
            .unwrap()
            .values()
            .map(|running| running.job.clone())
            .collect()
    }

    /// Formats offered for `target`, or the fallback table.
    ///
    /// The raw listing is cached per media URL; a listing that parses to no
    /// rows is dropped from the cache so the next call asks the tool again.
    pub async fn list_formats(&self, target: &str) -> Vec<Format> {
        let url = self.tool.media_url(target);

        let cached = self.format_cache.lock().unwrap().get(&url).cloned();
        let output = match cached {
            Some(output) => output,
            None => {
                let output = self.query_formats(&url).await;
                self.format_cache
                    .lock()
                    .unwrap()
                    .insert(url.clone(), output.clone());
                output
            }
        };

        let formats = parse_formats(&output);
        if formats.is_empty() {
            self.format_cache.lock().unwrap().remove(&url);
            FORMAT_FALLBACKS.inc();
            warn!(video = target, "No formats parsed from listing, using fallback table");
            debug!(video = target, "Format listing was: {}", output);
            return fallback_formats();
        }
        formats
    }

    async fn query_formats(&self, url: &str) -> String {
        let start = Instant::now();
        let result = Command::new(&self.tool.path)
            .arg("-F")
            .arg(url)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await;

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&["tool", "list_formats"])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(output) => {
                let label = if output.status.success() { "success" } else { "error" };
                EXTERNAL_SERVICE_REQUESTS
                    .with_label_values(&["tool", "list_formats", label])
                    .inc();
                String::from_utf8_lossy(&output.stdout).into_owned()
            }
            Err(e) => {
                EXTERNAL_SERVICE_REQUESTS
                    .with_label_values(&["tool", "list_formats", "error"])
                    .inc();
                error!("Failed to run {:?} -F: {}", self.tool.path, e);
                String::new()
            }
        }
    }

    fn spawn_download(&self, request: &JobRequest) -> Result<Child, JobError> {
        Command::new(&self.tool.path)
            .arg("-f")
            .arg(&request.format_id)
            .arg(self.tool.media_url(&request.target))
            .current_dir(self.artifacts.dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| JobError::spawn_failed(&self.tool.path, e.to_string()))
    }

    async fn supervise(&self, target: String, mut child: Child) {
        let started = Instant::now();
        let mut parser = ProgressParser::new();

        if let Some(mut stdout) = child.stdout.take() {
            let mut buf = vec![0u8; 4096];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        for line in parser.feed(&buf[..n]) {
                            self.publish_progress(&target, line);
                        }
                    }
                    Err(e) => {
                        warn!(video = %target, "Failed to read download output: {}", e);
                        break;
                    }
                }
            }
            if let Some(line) = parser.finish() {
                self.publish_progress(&target, line);
            }
        }

        let outcome = match child.wait().await {
            Ok(status) if status.success() => {
                match self.artifacts.find_by_target(&target).await {
                    Some(filename) => Ok(filename),
                    None => Err(JobFailure::MissingOutput),
                }
            }
            Ok(status) => Err(JobFailure::ExitCode(status.code())),
            Err(e) => Err(JobFailure::Io(e.to_string())),
        };

        let elapsed = started.elapsed().as_secs_f64();
        JOBS_RUNNING.dec();

        match outcome {
            Ok(filename) => {
                info!(video = %target, %filename, "Download finished");
                self.artifacts.retain(&filename);
                JOBS_FINISHED.with_label_values(&["succeeded"]).inc();
                JOB_DURATION
                    .with_label_values(&["succeeded"])
                    .observe(elapsed);
                self.finish(&target, JobStatus::Succeeded, |view, context| {
                    view.completed(context, &filename)
                });
            }
            Err(failure) => {
                warn!(video = %target, "Download failed: {}", failure);
                JOBS_FINISHED.with_label_values(&["failed"]).inc();
                JOB_DURATION.with_label_values(&["failed"]).observe(elapsed);
                self.finish(&target, JobStatus::Failed, |view, context| {
                    view.failed(context, &failure)
                });
            }
        }
    }

    fn watch_urls(&self, target: &str) -> Vec<String> {
        self.in_flight
            .lock()
            .unwrap()
            .get(target)
            .map(|running| running.job.watch_urls.clone())
            .unwrap_or_default()
    }

    fn publish_progress(&self, target: &str, line: String) {
        PROGRESS_EVENTS.inc();
        let message = ServerMessage::update_text(PROGRESS_SELECTOR, line);
        for url in self.watch_urls(target) {
            self.sessions.broadcast_to(&url, &message);
        }
    }

    /// Push the final panel to every watcher, then drop the job.
    fn finish<F>(&self, target: &str, status: JobStatus, render: F)
    where
        F: Fn(&dyn JobView, &JobContext) -> Node,
    {
        let Some(running) = self.in_flight.lock().unwrap().remove(target).map(|mut r| {
            r.job.status = status;
            r
        }) else {
            return;
        };

        let node = render(self.view.as_ref(), &running.context);
        for url in &running.job.watch_urls {
            let mut ctx = RenderContext::new(url.clone(), Transport::Channel);
            if let Some(patch) = to_patch_guarded(&mut ctx, &node) {
                let message = ServerMessage::update_in(DOWNLOAD_PANEL_SELECTOR, patch);
                let delivered = self.sessions.broadcast_to(url, &message);
                debug!(video = %target, %url, delivered, status = status.as_str(), "Pushed download panel");
            }
        }
    }
}

fn attach_url(running: &mut InFlight, request: &JobRequest) -> Job {
    if !running.job.watch_urls.contains(&request.current_url) {
        running.job.watch_urls.push(request.current_url.clone());
    }
    JOBS_DEDUPLICATED.with_label_values(&["attached"]).inc();
    info!(
        video = %request.target,
        url = %request.current_url,
        "Attached to running download"
    );
    running.job.clone()
}

/// Ids are interpolated into a URL and matched as a filename substring.
pub fn is_valid_target(target: &str) -> bool {
    !target.is_empty()
        && target
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_target() {
        assert!(is_valid_target("dQw4w9WgXcQ"));
        assert!(is_valid_target("a-b_c"));
        assert!(!is_valid_target(""));
        assert!(!is_valid_target("../etc"));
        assert!(!is_valid_target("abc def"));
    }
}
