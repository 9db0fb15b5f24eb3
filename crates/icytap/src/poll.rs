//! Polling driver
//!
//! Orchestrates repeated connect → drain → dedup → emit cycles over an ICY
//! stream. Single-shot mode performs one cycle and fails when no metadata
//! was retrieved; continuous mode loops with a fixed poll interval, retries
//! connect failures with exponential backoff, and stops gracefully on
//! cancellation or when the configured duration elapses.
//!
//! The wall clock and the connection step sit behind traits so the whole
//! state machine runs deterministically in tests.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::poll::POLL_INTERVAL_SECS;
use crate::error::{IcyError, Result};
use crate::sink::{MetadataEvent, Sink};
use crate::stream::metadata::decode_block;
use crate::stream::{backoff_delay, cancellable_sleep, DecodeMode, StreamSession, TrackMetadata};

/// Wall-clock and sleep abstraction.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Sleep for `duration`, waking early when `stop` is set.
    /// Returns false if cancelled.
    fn sleep(&self, duration: Duration, stop: &AtomicBool) -> bool;
}

/// Real time: `Instant::now` and stop-flag-aware sleeping.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration, stop: &AtomicBool) -> bool {
        cancellable_sleep(duration, stop)
    }
}

/// Produces a fresh [`StreamSession`] per poll cycle.
pub trait Connector {
    type Source: Read;

    fn connect(&mut self) -> Result<StreamSession<Self::Source>>;
}

/// Connects over HTTP with the ICY metadata request header.
pub struct HttpConnector {
    url: String,
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            timeout,
        }
    }
}

impl Connector for HttpConnector {
    type Source = reqwest::blocking::Response;

    fn connect(&mut self) -> Result<StreamSession<Self::Source>> {
        StreamSession::connect(&self.url, self.timeout)
    }
}

/// Single cycle or repeated polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    SingleShot,
    Continuous,
}

/// Driver configuration
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub mode: PollMode,
    pub decode_mode: DecodeMode,
    /// Total run bound for continuous mode; `None` runs until cancelled
    pub duration: Option<Duration>,
    /// Delay between poll cycles (bounds request rate)
    pub poll_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            mode: PollMode::SingleShot,
            decode_mode: DecodeMode::Title,
            duration: None,
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
        }
    }
}

/// Driver state machine phase, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollPhase {
    Idle,
    Connecting,
    Streaming,
    Emitting,
    Waiting,
    Stopped,
}

/// How a run ended (all variants are graceful)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Single-shot cycle completed with an emission
    Finished,
    /// Continuous run hit its duration bound
    DurationReached,
    /// Stop flag was set (user interrupt)
    Cancelled,
}

pub struct Poller<C: Connector, K: Clock> {
    config: PollConfig,
    connector: C,
    clock: K,
    stop: Arc<AtomicBool>,
    phase: PollPhase,
}

impl<C: Connector, K: Clock> Poller<C, K> {
    pub fn new(config: PollConfig, connector: C, clock: K) -> Self {
        Self {
            config,
            connector,
            clock,
            stop: Arc::new(AtomicBool::new(false)),
            phase: PollPhase::Idle,
        }
    }

    /// Shared stop flag; set it (e.g. from a Ctrl-C handler) to request a
    /// clean exit between reads.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    fn set_phase(&mut self, phase: PollPhase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "poll phase");
            self.phase = phase;
        }
    }

    /// Run to completion, emitting deduplicated updates into `sink`.
    pub fn run(&mut self, sink: &mut dyn Sink) -> Result<PollOutcome> {
        let started_at = self.clock.now();
        let deadline = self.config.duration.map(|d| started_at + d);

        match self.config.mode {
            PollMode::SingleShot => self.run_single_shot(sink, deadline),
            PollMode::Continuous => self.run_continuous(sink, deadline),
        }
    }

    fn run_single_shot(
        &mut self,
        sink: &mut dyn Sink,
        deadline: Option<Instant>,
    ) -> Result<PollOutcome> {
        self.set_phase(PollPhase::Connecting);
        let mut session = self.connector.connect()?;

        self.set_phase(PollPhase::Streaming);
        let update = self.drain_update(&mut session, deadline)?;
        match update {
            Some(metadata) => {
                self.set_phase(PollPhase::Emitting);
                sink.emit(&MetadataEvent::now(metadata))?;
                self.set_phase(PollPhase::Stopped);
                Ok(PollOutcome::Finished)
            }
            None => {
                self.set_phase(PollPhase::Stopped);
                Err(IcyError::NoMetadata)
            }
        }
    }

    fn run_continuous(
        &mut self,
        sink: &mut dyn Sink,
        deadline: Option<Instant>,
    ) -> Result<PollOutcome> {
        let mut last_key: Option<String> = None;
        let mut consecutive_failures: u32 = 0;

        loop {
            if self.stop.load(Ordering::Relaxed) {
                self.set_phase(PollPhase::Stopped);
                info!("Stopped by user");
                return Ok(PollOutcome::Cancelled);
            }
            if deadline.is_some_and(|d| self.clock.now() >= d) {
                self.set_phase(PollPhase::Stopped);
                info!("Stopped: reached duration limit");
                return Ok(PollOutcome::DurationReached);
            }

            self.set_phase(PollPhase::Connecting);
            let delay = match self.connector.connect() {
                Ok(mut session) => {
                    consecutive_failures = 0;
                    self.set_phase(PollPhase::Streaming);
                    match self.drain_update(&mut session, deadline) {
                        Ok(Some(metadata)) => {
                            let key = metadata.dedup_key();
                            if last_key.as_deref() != Some(key.as_str()) {
                                self.set_phase(PollPhase::Emitting);
                                sink.emit(&MetadataEvent::now(metadata))?;
                                last_key = Some(key);
                            }
                        }
                        // Session ended without an update; reconnect next cycle
                        Ok(None) => {}
                        Err(e) => warn!("Session error: {e}"),
                    }
                    self.config.poll_interval
                }
                Err(e) => {
                    consecutive_failures += 1;
                    warn!("Connect failed: {e}");
                    backoff_delay(consecutive_failures)
                }
            };

            self.set_phase(PollPhase::Waiting);
            if !self.clock.sleep(delay, &self.stop) {
                self.set_phase(PollPhase::Stopped);
                info!("Stopped by user");
                return Ok(PollOutcome::Cancelled);
            }
        }
    }

    /// Drain the session until the first non-empty update, end-of-stream,
    /// deadline, or cancellation. Checks happen between reads, never
    /// mid-parse, so a truncated block is never emitted.
    fn drain_update<R: Read>(
        &self,
        session: &mut StreamSession<R>,
        deadline: Option<Instant>,
    ) -> Result<Option<TrackMetadata>> {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Ok(None);
            }
            if deadline.is_some_and(|d| self.clock.now() >= d) {
                return Ok(None);
            }
            match session.next_block()? {
                Some(block) => {
                    if let Some(metadata) = decode_block(&block, self.config.decode_mode) {
                        return Ok(Some(metadata));
                    }
                }
                None => return Ok(None),
            }
        }
    }
}
