//! Stream handling
//!
//! Connects to ICY (Icecast/Shoutcast) streams, demultiplexes the in-band
//! metadata blocks from the audio payload, and decodes them into track
//! metadata.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::poll::{MAX_BACKOFF_SECS, RETRY_BASE_DELAY_SECS, SLEEP_CHECK_INTERVAL_MS};

pub mod demux;
pub mod metadata;
pub mod session;

pub use demux::IcyDemuxer;
pub use metadata::{DecodeMode, TrackMetadata};
pub use session::{IcyHeaders, StreamSession};

/// Calculate exponential backoff delay: min(2^(n-1) * base, max)
/// e.g., with base=2s: 2s, 4s, 8s, 10s, 10s, ...
pub(crate) fn backoff_delay(consecutive_failures: u32) -> Duration {
    let exp = consecutive_failures.saturating_sub(1).min(5);
    let delay_secs = RETRY_BASE_DELAY_SECS.saturating_mul(1u64 << exp);
    Duration::from_secs(delay_secs.min(MAX_BACKOFF_SECS))
}

/// Sleep for `total`, checking `stop_flag` every 250ms.
/// Returns true if the full duration elapsed, false if stopped early.
pub(crate) fn cancellable_sleep(total: Duration, stop_flag: &AtomicBool) -> bool {
    let interval = Duration::from_millis(SLEEP_CHECK_INTERVAL_MS);
    let start = std::time::Instant::now();
    while start.elapsed() < total {
        if stop_flag.load(Ordering::Relaxed) {
            return false;
        }
        let remaining = total.saturating_sub(start.elapsed());
        std::thread::sleep(remaining.min(interval));
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn backoff_delay_doubles_then_caps() {
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
        assert_eq!(backoff_delay(4), Duration::from_secs(16));
        assert_eq!(backoff_delay(5), Duration::from_secs(30));
        assert_eq!(backoff_delay(100), Duration::from_secs(30));
    }

    #[test]
    fn cancellable_sleep_completes() {
        let stop = AtomicBool::new(false);
        let start = Instant::now();
        assert!(cancellable_sleep(Duration::from_millis(300), &stop));
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[test]
    fn cancellable_sleep_stops_early() {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();

        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            stop_clone.store(true, Ordering::Relaxed);
        });

        let start = Instant::now();
        assert!(!cancellable_sleep(Duration::from_secs(8), &stop));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
