//! Output sinks for emitted metadata events
//!
//! The polling driver never opens files or writes to the console itself; it
//! hands each emitted event to a [`Sink`]. Console and append-only file
//! sinks are provided, plus a fan-out for running both.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};

use crate::error::Result;
use crate::stream::TrackMetadata;

/// One emitted metadata update
#[derive(Debug, Clone)]
pub struct MetadataEvent {
    pub at: DateTime<Local>,
    pub metadata: TrackMetadata,
}

impl MetadataEvent {
    pub fn now(metadata: TrackMetadata) -> Self {
        Self {
            at: Local::now(),
            metadata,
        }
    }

    /// `[<timestamp>] Metadata: <title>` or `[<timestamp>] <key>: <value>, …`
    pub fn log_line(&self) -> String {
        format!("[{}] {}", self.at.format("%Y-%m-%d %H:%M:%S"), self.metadata)
    }
}

/// Accepts emitted metadata events
pub trait Sink {
    fn emit(&mut self, event: &MetadataEvent) -> Result<()>;
}

/// Prints events to stdout, with or without timestamps
pub struct ConsoleSink {
    timestamps: bool,
}

impl ConsoleSink {
    /// `timestamps: true` for continuous mode, false for single-shot
    pub fn new(timestamps: bool) -> Self {
        Self { timestamps }
    }
}

impl Sink for ConsoleSink {
    fn emit(&mut self, event: &MetadataEvent) -> Result<()> {
        if self.timestamps {
            println!("{}", event.log_line());
        } else {
            println!("{}", event.metadata);
        }
        Ok(())
    }
}

/// Appends one timestamped line per event to a text log
pub struct FileSink {
    file: File,
}

impl FileSink {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl Sink for FileSink {
    fn emit(&mut self, event: &MetadataEvent) -> Result<()> {
        writeln!(self.file, "{}", event.log_line())?;
        self.file.flush()?;
        Ok(())
    }
}

/// Forwards each event to every inner sink
pub struct MultiSink {
    sinks: Vec<Box<dyn Sink>>,
}

impl MultiSink {
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { sinks }
    }
}

impl Sink for MultiSink {
    fn emit(&mut self, event: &MetadataEvent) -> Result<()> {
        for sink in &mut self.sinks {
            sink.emit(event)?;
        }
        Ok(())
    }
}

/// Collects events in memory, for tests
#[cfg(test)]
pub struct VecSink(pub Vec<MetadataEvent>);

#[cfg(test)]
impl Sink for VecSink {
    fn emit(&mut self, event: &MetadataEvent) -> Result<()> {
        self.0.push(event.clone());
        Ok(())
    }
}
