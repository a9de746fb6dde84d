//! Configuration validation logic.

use crate::config::loader::Config;
use crate::error::{Error, Result};

/// Minimum length for user agent.
const MIN_USER_AGENT_LENGTH: usize = 20;

/// Maximum number of concurrent workers.
const MAX_WORKERS: usize = 16;

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_user_agent(&config.http.user_agent)?;
    validate_timeout(config.http.timeout_seconds)?;
    validate_backoff(
        config.backoff.floor_seconds,
        config.backoff.ceiling_seconds,
    )?;
    validate_jitter(config.backoff.jitter_min_ms, config.backoff.jitter_max_ms)?;
    validate_workers(config.options.workers)?;

    if config.output.directory.as_os_str().is_empty() {
        return Err(Error::MissingConfig("output.directory".to_string()));
    }

    Ok(())
}

/// Validate the user agent string.
pub fn validate_user_agent(user_agent: &str) -> Result<()> {
    if user_agent.trim().is_empty() {
        return Err(Error::MissingConfig("http.user_agent".to_string()));
    }

    if user_agent.len() < MIN_USER_AGENT_LENGTH {
        return Err(Error::ConfigValidation {
            field: "http.user_agent".to_string(),
            message: format!(
                "User agent must be at least {} characters (got {})",
                MIN_USER_AGENT_LENGTH,
                user_agent.len()
            ),
        });
    }

    Ok(())
}

/// Validate the request timeout.
pub fn validate_timeout(timeout_seconds: u64) -> Result<()> {
    if timeout_seconds == 0 {
        return Err(Error::ConfigValidation {
            field: "http.timeout_seconds".to_string(),
            message: "Timeout must be greater than zero".to_string(),
        });
    }

    Ok(())
}

/// Validate the rate-limit floor and ceiling.
pub fn validate_backoff(floor_seconds: u64, ceiling_seconds: u64) -> Result<()> {
    if floor_seconds == 0 {
        return Err(Error::ConfigValidation {
            field: "backoff.floor_seconds".to_string(),
            message: "Backoff floor must be greater than zero (doubling zero never grows)"
                .to_string(),
        });
    }

    if ceiling_seconds < floor_seconds {
        return Err(Error::ConfigValidation {
            field: "backoff.ceiling_seconds".to_string(),
            message: format!(
                "Backoff ceiling ({}s) must not be below the floor ({}s)",
                ceiling_seconds, floor_seconds
            ),
        });
    }

    Ok(())
}

/// Validate the politeness jitter range.
pub fn validate_jitter(min_ms: u64, max_ms: u64) -> Result<()> {
    if min_ms > max_ms {
        return Err(Error::ConfigValidation {
            field: "backoff.jitter_min_ms".to_string(),
            message: format!(
                "Jitter minimum ({}ms) exceeds maximum ({}ms)",
                min_ms, max_ms
            ),
        });
    }

    Ok(())
}

/// Validate the worker count.
pub fn validate_workers(workers: usize) -> Result<()> {
    if workers == 0 || workers > MAX_WORKERS {
        return Err(Error::ConfigValidation {
            field: "options.workers".to_string(),
            message: format!(
                "Workers must be between 1 and {} (got {})",
                MAX_WORKERS, workers
            ),
        });
    }

    Ok(())
}
