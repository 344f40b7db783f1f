//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client core.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::net::classify::PayloadFormat;

/// Root configuration for the client core.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Engine response streaming.
    pub stream: StreamConfig,

    /// Document parsing and highlighting.
    pub document: DocumentConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Engine response streaming configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Path of the engine API socket.
    pub socket_path: String,

    /// Bytes requested per read from the socket.
    pub read_buffer_size: usize,

    /// Messages buffered between the reader and the consumer callback.
    pub channel_capacity: usize,

    /// Largest accepted response head (status line plus headers).
    pub max_header_bytes: usize,

    /// Largest accepted chunk or multiplexed frame payload.
    pub max_payload_bytes: usize,

    /// How body payloads are delivered.
    pub payload_format: PayloadFormat,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            socket_path: crate::net::docker::DEFAULT_SOCKET_PATH.to_string(),
            read_buffer_size: 8 * 1024,
            channel_capacity: 64,
            max_header_bytes: 64 * 1024,
            max_payload_bytes: 64 * 1024 * 1024,
            payload_format: PayloadFormat::Auto,
        }
    }
}

/// Document configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// syntect theme used for code chunks.
    pub highlight_theme: String,

    /// Syntax token for code chunks (e.g., "R").
    pub code_syntax: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            highlight_theme: "InspiredGitHub".to_string(),
            code_syntax: "R".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}
