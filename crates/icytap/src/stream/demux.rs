//! ICY frame demultiplexer
//!
//! Splits a single ICY byte stream into audio payload (discarded) and
//! length-prefixed metadata blocks. Push-based: callers feed chunks of any
//! size and collect whatever complete blocks became available; partial state
//! is carried in a residual buffer across pushes, so chunk boundaries may
//! fall anywhere — mid-payload, on the length byte, or inside a block.

use crate::config::icy::META_LENGTH_UNIT;
use crate::error::{IcyError, Result};

/// Incremental demultiplexer for one ICY session.
///
/// Invariant: `bytes_until_meta` stays in `[0, metaint]`; it is 0 exactly
/// while the parser is positioned at (or waiting for) a length prefix.
#[derive(Debug)]
pub struct IcyDemuxer {
    metaint: usize,
    buffer: Vec<u8>,
    bytes_until_meta: usize,
}

impl IcyDemuxer {
    /// Create a demuxer for a stream with the given metadata interval.
    ///
    /// `metaint == 0` is a configuration error: the server either did not
    /// agree to interleave metadata or sent a nonsense header. Rejected here,
    /// once, rather than per block.
    pub fn new(metaint: usize) -> Result<Self> {
        if metaint == 0 {
            return Err(IcyError::InvalidMetaint("0".to_string()));
        }
        Ok(Self {
            metaint,
            buffer: Vec::new(),
            bytes_until_meta: metaint,
        })
    }

    /// Feed one chunk of stream bytes and collect the raw metadata blocks
    /// that became complete.
    ///
    /// Blocks are returned undecoded and may be empty (length byte 0, the
    /// server's "no change" signal) or null-padded. An empty `chunk` is a
    /// no-op here; end-of-stream handling belongs to the caller.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);

        let mut blocks = Vec::new();
        loop {
            // Drop buffered audio payload up to the next metadata position.
            if self.bytes_until_meta > 0 {
                let n = self.buffer.len().min(self.bytes_until_meta);
                self.buffer.drain(..n);
                self.bytes_until_meta -= n;
                if self.bytes_until_meta > 0 {
                    break; // still inside the audio span, wait for more input
                }
            }

            // Positioned at a length prefix. Not an error if it hasn't
            // arrived yet — just backpressure.
            let Some(&len_byte) = self.buffer.first() else {
                break;
            };
            let meta_len = len_byte as usize * META_LENGTH_UNIT;

            // The block may span a future chunk; keep the prefix and the
            // partial block buffered rather than discarding them.
            if self.buffer.len() < 1 + meta_len {
                break;
            }

            let block: Vec<u8> = self.buffer.drain(..1 + meta_len).skip(1).collect();
            self.bytes_until_meta = self.metaint;
            blocks.push(block);
        }
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build one framing cycle: `metaint` filler bytes, a length byte, and
    /// the metadata text null-padded to `len_byte * 16`.
    fn cycle(metaint: usize, meta: &[u8]) -> Vec<u8> {
        let len_byte = meta.len().div_ceil(16);
        let mut out = vec![0xAA; metaint];
        out.push(len_byte as u8);
        let mut padded = meta.to_vec();
        padded.resize(len_byte * 16, 0);
        out.extend_from_slice(&padded);
        out
    }

    #[test]
    fn zero_metaint_rejected() {
        assert!(matches!(
            IcyDemuxer::new(0),
            Err(IcyError::InvalidMetaint(_))
        ));
    }

    #[test]
    fn single_block_single_push() {
        let mut demux = IcyDemuxer::new(100).unwrap();
        let stream = cycle(100, b"StreamTitle='Test';");
        let blocks = demux.push(&stream);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].starts_with(b"StreamTitle='Test';"));
        assert_eq!(blocks[0].len(), 32); // padded to the 16-byte unit
    }

    #[test]
    fn zero_length_block_emitted_empty() {
        let mut demux = IcyDemuxer::new(10).unwrap();
        let mut stream = vec![0u8; 10];
        stream.push(0); // length byte 0 → "no change"
        let blocks = demux.push(&stream);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].is_empty());
    }

    #[test]
    fn chunk_boundary_invariance() {
        // K cycles, replayed at several chunk sizes including byte-at-a-time.
        // The emitted blocks must be identical regardless of chunking.
        let metaint = 37;
        let metas: [&[u8]; 3] = [
            b"StreamTitle='One';",
            b"",
            b"StreamTitle='Three';StreamUrl='x';",
        ];
        let mut stream = Vec::new();
        for meta in metas {
            stream.extend_from_slice(&cycle(metaint, meta));
        }

        let mut reference = IcyDemuxer::new(metaint).unwrap();
        let expected = reference.push(&stream);
        assert_eq!(expected.len(), 3);

        for chunk_size in [1, 2, 7, 16, 64, 1024] {
            let mut demux = IcyDemuxer::new(metaint).unwrap();
            let mut got = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                got.extend(demux.push(chunk));
            }
            assert_eq!(got, expected, "chunk_size={chunk_size}");
        }
    }

    #[test]
    fn partial_metadata_not_discarded() {
        let mut demux = IcyDemuxer::new(5).unwrap();
        let stream = cycle(5, b"StreamTitle='Kept';");

        // Everything up to the middle of the metadata block
        let split = 5 + 1 + 10;
        assert!(demux.push(&stream[..split]).is_empty());

        // Remainder arrives; the buffered half must still be there
        let blocks = demux.push(&stream[split..]);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].starts_with(b"StreamTitle='Kept';"));
    }

    #[test]
    fn length_byte_on_chunk_boundary() {
        let mut demux = IcyDemuxer::new(8).unwrap();
        let stream = cycle(8, b"StreamTitle='B';");

        // Audio exactly fills the first push; length byte not yet available
        assert!(demux.push(&stream[..8]).is_empty());
        let blocks = demux.push(&stream[8..]);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn multiple_blocks_in_one_push() {
        let metaint = 4;
        let mut stream = cycle(metaint, b"StreamTitle='A';");
        stream.extend_from_slice(&cycle(metaint, b"StreamTitle='B';"));
        let mut demux = IcyDemuxer::new(metaint).unwrap();
        let blocks = demux.push(&stream);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with(b"StreamTitle='A';"));
        assert!(blocks[1].starts_with(b"StreamTitle='B';"));
    }

    #[test]
    fn empty_push_is_noop() {
        let mut demux = IcyDemuxer::new(10).unwrap();
        assert!(demux.push(&[]).is_empty());
        assert!(demux.push(&[]).is_empty());
    }

    #[test]
    fn countdown_resets_after_block() {
        let metaint = 6;
        let mut demux = IcyDemuxer::new(metaint).unwrap();
        let one = cycle(metaint, b"");
        demux.push(&one);
        // After a full cycle the demuxer expects a fresh audio span:
        // feeding metaint - 1 bytes must not produce anything.
        assert!(demux.push(&vec![0u8; metaint - 1]).is_empty());
        assert_eq!(demux.push(&[0u8, 0u8]).len(), 1);
    }
}
