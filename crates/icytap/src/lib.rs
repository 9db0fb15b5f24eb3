//! Icytap — ICY now-playing metadata extractor
//!
//! Connects to Icecast/Shoutcast streams with `Icy-MetaData: 1`, demultiplexes
//! the in-band metadata blocks from the audio payload, and reports track title
//! changes to a sink.
//!
//! ## Quick start
//!
//! ```no_run
//! use icytap::poll::{PollConfig, Poller};
//! use icytap::sink::ConsoleSink;
//! ```

pub mod config;
pub mod error;
pub mod poll;
pub mod sink;
pub mod stream;
