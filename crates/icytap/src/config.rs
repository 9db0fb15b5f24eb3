//! Configuration constants for the icytap engine

/// Network-related configuration
pub mod network {
    /// User agent for HTTP requests
    pub const USER_AGENT: &str = concat!("Icytap/", env!("CARGO_PKG_VERSION"));

    /// Connection timeout in seconds (overridable per session)
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Read timeout in seconds
    pub const READ_TIMEOUT_SECS: u64 = 30;

    /// Chunk size for reads from the response body (bytes)
    pub const CHUNK_SIZE: usize = 8 * 1024;
}

/// Polling configuration for resilience
pub mod poll {
    /// Delay between poll cycles in seconds (bounds request rate)
    pub const POLL_INTERVAL_SECS: u64 = 1;

    /// Base delay between retries in seconds (exponential backoff: 2^n * base)
    pub const RETRY_BASE_DELAY_SECS: u64 = 2;

    /// Maximum backoff delay in seconds (cap for exponential backoff)
    pub const MAX_BACKOFF_SECS: u64 = 30;

    /// Interval at which cancellable sleeps re-check the stop flag (ms)
    pub const SLEEP_CHECK_INTERVAL_MS: u64 = 250;
}

/// ICY protocol constants
pub mod icy {
    /// A metadata block's length byte counts units of 16 bytes
    pub const META_LENGTH_UNIT: usize = 16;
}
