use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub downloads: DownloadsConfig,
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory of static assets (client script, styles).
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_dir: default_public_dir(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8100
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

/// Document title and description fallbacks.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,
    #[serde(default = "default_site_description")]
    pub description: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            description: default_site_description(),
        }
    }
}

fn default_site_name() -> String {
    "tubefetch".to_string()
}

fn default_site_description() -> String {
    "Search and download videos".to_string()
}

impl SiteConfig {
    /// Page title with the site name appended.
    pub fn title(&self, page: &str) -> String {
        format!("{} | {}", page, self.name)
    }
}

/// Download directory and artifact lifetime.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadsConfig {
    #[serde(default = "default_download_dir")]
    pub dir: PathBuf,
    /// Seconds a downloaded file survives after its last reference.
    #[serde(default = "default_artifact_ttl")]
    pub artifact_ttl_secs: u64,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            dir: default_download_dir(),
            artifact_ttl_secs: default_artifact_ttl(),
        }
    }
}

impl DownloadsConfig {
    pub fn artifact_ttl(&self) -> Duration {
        Duration::from_secs(self.artifact_ttl_secs)
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_artifact_ttl() -> u64 {
    3 * 60 * 60
}

/// External extraction tool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolConfig {
    /// Path or name of the yt-dlp compatible binary.
    #[serde(default = "default_tool_path")]
    pub path: PathBuf,
    /// Prefix turned into a media URL by appending the target id.
    #[serde(default = "default_watch_url_base")]
    pub watch_url_base: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            path: default_tool_path(),
            watch_url_base: default_watch_url_base(),
        }
    }
}

impl ToolConfig {
    pub fn media_url(&self, target: &str) -> String {
        format!("{}{}", self.watch_url_base, target)
    }
}

fn default_tool_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_watch_url_base() -> String {
    "https://www.youtube.com/watch?v=".to_string()
}

/// Search API client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    #[serde(default = "default_client_version")]
    pub client_version: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            timeout_secs: default_timeout(),
            client_version: default_client_version(),
        }
    }
}

fn default_search_base_url() -> String {
    "https://www.youtube.com/youtubei/v1".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_client_version() -> String {
    "2.20240101.00.00".to_string()
}

/// Lifetime of "show more results" continuation tokens.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationConfig {
    #[serde(default = "default_pagination_ttl")]
    pub ttl_secs: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_pagination_ttl(),
        }
    }
}

impl PaginationConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

fn default_pagination_ttl() -> u64 {
    3 * 60 * 60
}

/// Config view for the API (paths and limits only).
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub site: SiteConfig,
    pub downloads: DownloadsConfig,
    pub tool_path: String,
    pub search_base_url: String,
    pub pagination_ttl_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            site: config.site.clone(),
            downloads: config.downloads.clone(),
            tool_path: config.tool.path.display().to_string(),
            search_base_url: config.search.base_url.clone(),
            pagination_ttl_secs: config.pagination.ttl_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8100);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.downloads.dir, PathBuf::from("downloads"));
        assert_eq!(config.downloads.artifact_ttl_secs, 10800);
        assert_eq!(config.pagination.ttl_secs, 10800);
        assert_eq!(config.tool.path, PathBuf::from("yt-dlp"));
    }

    #[test]
    fn test_deserialize_custom_sections() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[downloads]
dir = "/var/tubefetch"
artifact_ttl_secs = 60

[tool]
path = "/usr/local/bin/yt-dlp"
watch_url_base = "https://example.test/v/"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.downloads.artifact_ttl(), Duration::from_secs(60));
        assert_eq!(config.tool.media_url("abc"), "https://example.test/v/abc");
    }

    #[test]
    fn test_site_title() {
        let site = SiteConfig::default();
        assert_eq!(site.title("Search Videos"), "Search Videos | tubefetch");
    }

    #[test]
    fn test_sanitized_config() {
        let config = Config::default();
        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.tool_path, "yt-dlp");
        assert_eq!(sanitized.server.port, 8100);
        assert_eq!(sanitized.pagination_ttl_secs, 10800);
    }
}
