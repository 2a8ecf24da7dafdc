use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - TTLs are non-zero
/// - Tool path is set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.downloads.artifact_ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "downloads.artifact_ttl_secs cannot be 0".to_string(),
        ));
    }

    if config.pagination.ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "pagination.ttl_secs cannot be 0".to_string(),
        ));
    }

    if config.tool.path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "tool.path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
