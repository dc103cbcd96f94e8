//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("timing.active_window_secs must be greater than zero")]
    ZeroActiveWindow,
    #[error("timing.clean_after_secs must be greater than zero")]
    ZeroCleanAfter,
    #[error("queue.queue_prefix must not be empty")]
    EmptyQueuePrefix,
    #[error("queue.teacher_role_prefix must not be empty")]
    EmptyTeacherPrefix,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.timing.active_window_secs == 0 {
        errors.push(ValidationError::ZeroActiveWindow);
    }
    if config.timing.clean_after_secs == 0 {
        errors.push(ValidationError::ZeroCleanAfter);
    }

    // An empty prefix would classify every channel as a queue
    if config.queue.queue_prefix.trim().is_empty() {
        errors.push(ValidationError::EmptyQueuePrefix);
    }
    if config.queue.teacher_role_prefix.trim().is_empty() {
        errors.push(ValidationError::EmptyTeacherPrefix);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
