//! Error types for Icytap
//!
//! Centralized error handling using thiserror. Session-level failures live
//! here; block-level problems (malformed or empty metadata) are logged and
//! swallowed by the decoder instead of surfacing as errors.

use thiserror::Error;

/// Main error type for the icytap engine
#[derive(Error, Debug)]
pub enum IcyError {
    #[error("{}", friendly_network_error(.0))]
    Network(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Http(reqwest::StatusCode),

    #[error("No icy-metaint header found in response")]
    MissingMetaint,

    #[error("Invalid icy-metaint value: {0}")]
    InvalidMetaint(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No metadata retrieved")]
    NoMetadata,
}

/// Result type alias for Icytap
pub type Result<T> = std::result::Result<T, IcyError>;

fn friendly_network_error(e: &reqwest::Error) -> String {
    if e.is_builder() {
        if let Some(url) = e.url() {
            return format!("Invalid URL: {url}");
        }
        return "Invalid URL".to_string();
    }
    if e.is_connect() {
        if let Some(url) = e.url() {
            return format!("Could not connect to {}", url.host_str().unwrap_or("server"));
        }
        return "Could not connect to server".to_string();
    }
    if e.is_timeout() {
        return "Connection timed out".to_string();
    }
    if e.is_decode() {
        return "Invalid response from server".to_string();
    }
    format!("Network error: {e}")
}
