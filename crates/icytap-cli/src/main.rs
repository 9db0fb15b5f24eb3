//! Icytap CLI — fetch now-playing metadata from Icecast/Shoutcast streams

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use icytap::config::network::CONNECT_TIMEOUT_SECS;
use icytap::error::IcyError;
use icytap::poll::{HttpConnector, PollConfig, PollMode, Poller, SystemClock};
use icytap::sink::{ConsoleSink, FileSink, MultiSink, Sink};
use icytap::stream::DecodeMode;

#[derive(Parser)]
#[command(
    name = "icytap",
    about = "Retrieve ICY metadata from an Icecast or Shoutcast stream",
    version
)]
struct Cli {
    /// Stream URL
    url: String,

    /// Timeout in seconds for the initial connection
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS)]
    timeout: u64,

    /// Run continuously, polling for metadata changes
    #[arg(long)]
    continuous: bool,

    /// Duration in seconds for continuous mode (default: run until interrupted)
    #[arg(long)]
    duration: Option<u64>,

    /// Append timestamped metadata lines to this file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Report every key='value' field instead of just the title
    #[arg(long)]
    fields: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("icytap=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = PollConfig {
        mode: if cli.continuous {
            PollMode::Continuous
        } else {
            PollMode::SingleShot
        },
        decode_mode: if cli.fields {
            DecodeMode::Fields
        } else {
            DecodeMode::Title
        },
        duration: cli.duration.map(Duration::from_secs),
        ..PollConfig::default()
    };

    let mut sinks: Vec<Box<dyn Sink>> = vec![Box::new(ConsoleSink::new(cli.continuous))];
    if let Some(ref path) = cli.output {
        match FileSink::open(path) {
            Ok(sink) => sinks.push(Box::new(sink)),
            Err(e) => {
                eprintln!("Error: cannot open {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }
    let mut sink = MultiSink::new(sinks);

    let connector = HttpConnector::new(&cli.url, Duration::from_secs(cli.timeout));
    let mut poller = Poller::new(config, connector, SystemClock);

    // Ctrl-C requests a clean exit between reads
    let stop = poller.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed)) {
        eprintln!("Warning: could not install interrupt handler: {e}");
    }

    match poller.run(&mut sink) {
        Ok(_) => {}
        Err(IcyError::NoMetadata) => {
            eprintln!("No metadata retrieved");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
