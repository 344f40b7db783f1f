//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (buffer sizes > 0, limits ordered)
//! - Reject unknown log levels and formats
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::ClientConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("stream.max_header_bytes ({header}) exceeds stream.max_payload_bytes ({payload})")]
    HeaderLimitTooLarge { header: usize, payload: usize },

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),

    #[error("unknown log format '{0}'")]
    UnknownLogFormat(String),

    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let stream = &config.stream;

    for (field, value) in [
        ("stream.read_buffer_size", stream.read_buffer_size),
        ("stream.channel_capacity", stream.channel_capacity),
        ("stream.max_header_bytes", stream.max_header_bytes),
        ("stream.max_payload_bytes", stream.max_payload_bytes),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }
    if stream.max_header_bytes > stream.max_payload_bytes {
        errors.push(ValidationError::HeaderLimitTooLarge {
            header: stream.max_header_bytes,
            payload: stream.max_payload_bytes,
        });
    }
    if stream.socket_path.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "stream.socket_path" });
    }

    if config.document.code_syntax.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "document.code_syntax" });
    }
    if config.document.highlight_theme.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "document.highlight_theme" });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }
    if !LOG_FORMATS.contains(&config.observability.log_format.as_str()) {
        errors.push(ValidationError::UnknownLogFormat(config.observability.log_format.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&ClientConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = ClientConfig::default();
        config.stream.read_buffer_size = 0;
        config.stream.channel_capacity = 0;
        config.observability.log_level = "loud".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::Zero { field: "stream.read_buffer_size" }));
        assert!(errors.contains(&ValidationError::UnknownLogLevel("loud".to_string())));
    }

    #[test]
    fn test_header_limit_must_fit_payload_limit() {
        let mut config = ClientConfig::default();
        config.stream.max_header_bytes = 1024;
        config.stream.max_payload_bytes = 512;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::HeaderLimitTooLarge { header: 1024, payload: 512 }])
        );
    }
}
