//! ICY stream session
//!
//! One open connection to an Icecast/Shoutcast server: validates the
//! `icy-metaint` handshake, then exposes `next_block()` as the single
//! operation collaborators call repeatedly. Generic over the byte source so
//! tests drive it from an in-memory cursor.

use std::collections::VecDeque;
use std::io::Read;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::network::{CHUNK_SIZE, READ_TIMEOUT_SECS, USER_AGENT};
use crate::error::{IcyError, Result};
use crate::stream::demux::IcyDemuxer;

/// Headers parsed from an ICY stream response
#[derive(Debug, Clone)]
pub struct IcyHeaders {
    pub metaint: usize,
    pub station_name: Option<String>,
    pub content_type: Option<String>,
    pub bitrate: Option<u32>,
}

/// An open ICY session over any blocking byte source.
pub struct StreamSession<R: Read> {
    source: R,
    demux: IcyDemuxer,
    pending: VecDeque<Vec<u8>>,
    chunk: Vec<u8>,
    pub headers: IcyHeaders,
}

impl StreamSession<reqwest::blocking::Response> {
    /// Connect to a stream URL with the `Icy-MetaData: 1` request header.
    ///
    /// `timeout` bounds the connection attempt; reads use the fixed
    /// [`READ_TIMEOUT_SECS`]. Fails before any payload byte is consumed when
    /// the server returns a non-success status or an absent/non-positive
    /// `icy-metaint`.
    pub fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout)
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .build()?;

        let response = client.get(url).header("Icy-MetaData", "1").send()?;

        if !response.status().is_success() {
            return Err(IcyError::Http(response.status()));
        }

        let headers = parse_icy_headers(&response)?;
        debug!(
            metaint = headers.metaint,
            station = headers.station_name.as_deref().unwrap_or(""),
            content_type = headers.content_type.as_deref().unwrap_or(""),
            bitrate = headers.bitrate.unwrap_or(0),
            "connected"
        );

        Self::from_parts(response, headers)
    }
}

impl<R: Read> StreamSession<R> {
    /// Build a session from an already-validated source and headers.
    pub fn from_parts(source: R, headers: IcyHeaders) -> Result<Self> {
        let demux = IcyDemuxer::new(headers.metaint)?;
        Ok(Self {
            source,
            demux,
            pending: VecDeque::new(),
            chunk: vec![0u8; CHUNK_SIZE],
            headers,
        })
    }

    /// Read forward until the next raw metadata block is available.
    ///
    /// `Ok(None)` means the stream ended (zero-length read) — graceful, not
    /// an error. Read errors end the session and propagate.
    pub fn next_block(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(block) = self.pending.pop_front() {
                return Ok(Some(block));
            }
            let n = self.source.read(&mut self.chunk)?;
            if n == 0 {
                warn!("Stream ended");
                return Ok(None);
            }
            self.pending.extend(self.demux.push(&self.chunk[..n]));
        }
    }
}

fn parse_icy_headers(response: &reqwest::blocking::Response) -> Result<IcyHeaders> {
    let headers = response.headers();

    // Absent and invalid are distinct failures; both happen before any
    // payload byte is consumed.
    let raw_metaint = headers.get("icy-metaint").ok_or(IcyError::MissingMetaint)?;
    let metaint = raw_metaint
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&m| m > 0)
        .ok_or_else(|| {
            IcyError::InvalidMetaint(String::from_utf8_lossy(raw_metaint.as_bytes()).into_owned())
        })?;

    let station_name = headers
        .get("icy-name")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let bitrate = headers
        .get("icy-br")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u32>().ok());

    Ok(IcyHeaders {
        metaint,
        station_name,
        content_type,
        bitrate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::metadata::{decode_block, DecodeMode, TrackMetadata};
    use std::io::Cursor;

    fn headers(metaint: usize) -> IcyHeaders {
        IcyHeaders {
            metaint,
            station_name: None,
            content_type: None,
            bitrate: None,
        }
    }

    #[test]
    fn zero_metaint_fails_before_reading() {
        let source = Cursor::new(vec![1u8; 64]);
        assert!(matches!(
            StreamSession::from_parts(source, headers(0)),
            Err(IcyError::InvalidMetaint(_))
        ));
    }

    #[test]
    fn end_to_end_title_extraction() {
        // metaint=100, audio filler, length byte 3 (48 bytes),
        // StreamTitle='Test'; null-padded to 48
        let mut stream = vec![0x55u8; 100];
        stream.push(3);
        let mut meta = b"StreamTitle='Test';".to_vec();
        meta.resize(48, 0);
        stream.extend_from_slice(&meta);

        let mut session = StreamSession::from_parts(Cursor::new(stream), headers(100)).unwrap();
        let block = session.next_block().unwrap().unwrap();
        assert_eq!(
            decode_block(&block, DecodeMode::Title),
            Some(TrackMetadata::Title("Test".to_string()))
        );
    }

    #[test]
    fn eof_yields_none() {
        let mut session =
            StreamSession::from_parts(Cursor::new(Vec::new()), headers(10)).unwrap();
        assert!(session.next_block().unwrap().is_none());
    }

    #[test]
    fn eof_mid_audio_yields_none() {
        // Stream ends before the first metadata position
        let mut session =
            StreamSession::from_parts(Cursor::new(vec![0u8; 50]), headers(100)).unwrap();
        assert!(session.next_block().unwrap().is_none());
    }

    #[test]
    fn successive_blocks_in_order() {
        let metaint = 20;
        let mut stream = Vec::new();
        for title in ["StreamTitle='First';", "StreamTitle='Second';"] {
            stream.extend_from_slice(&vec![0x11u8; metaint]);
            let mut meta = title.as_bytes().to_vec();
            let padded = meta.len().div_ceil(16) * 16;
            let len_byte = (padded / 16) as u8;
            meta.resize(padded, 0);
            stream.push(len_byte);
            stream.extend_from_slice(&meta);
        }

        let mut session =
            StreamSession::from_parts(Cursor::new(stream), headers(metaint)).unwrap();
        let a = session.next_block().unwrap().unwrap();
        let b = session.next_block().unwrap().unwrap();
        assert!(a.starts_with(b"StreamTitle='First';"));
        assert!(b.starts_with(b"StreamTitle='Second';"));
        assert!(session.next_block().unwrap().is_none());
    }
}
