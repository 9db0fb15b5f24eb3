//! ICY metadata decoding
//!
//! Turns a raw metadata block into structured track metadata. Two modes:
//! targeted `StreamTitle` extraction (with percent-decoding) and general
//! `key='value'` field scanning (values kept raw). The asymmetry in
//! normalization is deliberate; downstream tooling depends on each.

use std::fmt;

use tracing::warn;

/// How metadata blocks are decoded into [`TrackMetadata`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Extract only `StreamTitle`, percent-decoded and trimmed
    #[default]
    Title,
    /// Collect every `key='value'` pair, values stored raw
    Fields,
}

/// Decoded track metadata from one ICY block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackMetadata {
    /// Targeted extraction result
    Title(String),
    /// General extraction result, in stream order
    Fields(Vec<(String, String)>),
}

impl TrackMetadata {
    /// Key used for consecutive-update deduplication
    pub fn dedup_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TrackMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackMetadata::Title(title) => write!(f, "Metadata: {title}"),
            TrackMetadata::Fields(fields) => {
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                Ok(())
            }
        }
    }
}

/// Decode a raw metadata block according to `mode`.
///
/// Returns `None` for empty blocks (the "no change" signal), for blocks
/// without usable content, and for malformed blocks — the latter two with a
/// warning. Never fails: a bad block must not take the session down.
pub fn decode_block(raw_block: &[u8], mode: DecodeMode) -> Option<TrackMetadata> {
    let text = block_text(raw_block)?;
    match mode {
        DecodeMode::Title => parse_stream_title(&text).map(TrackMetadata::Title),
        DecodeMode::Fields => {
            let fields = parse_fields(&text);
            if fields.is_empty() {
                warn!("No fields in metadata: {text}");
                None
            } else {
                Some(TrackMetadata::Fields(fields))
            }
        }
    }
}

/// Strip null padding and decode a block as text, replacing undecodable
/// byte sequences instead of failing.
///
/// Raw ICY metadata blocks are null-padded to a multiple of 16 bytes.
fn block_text(raw_block: &[u8]) -> Option<String> {
    let end = raw_block
        .iter()
        .rposition(|&b| b != 0)
        .map(|p| p + 1)
        .unwrap_or(0);
    if end == 0 {
        return None;
    }
    Some(String::from_utf8_lossy(&raw_block[..end]).into_owned())
}

/// Targeted extraction: the `StreamTitle` value, percent-decoded.
///
/// ICY metadata format: `StreamTitle='Artist - Song';StreamUrl='...';`
/// A missing `';` closing delimiter is malformed — warn and yield nothing.
pub fn parse_stream_title(metadata: &str) -> Option<String> {
    let Some(start) = metadata.find("StreamTitle='") else {
        warn!("No StreamTitle in metadata: {metadata}");
        return None;
    };
    let start = start + 13; // length of "StreamTitle='"
    let Some(end) = metadata[start..].find("';") else {
        warn!("Malformed metadata: {metadata}");
        return None;
    };
    let title = metadata[start..start + end].trim();
    if title.is_empty() {
        return None;
    }
    let title = urlencoding::decode(title)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| title.to_string());
    Some(title)
}

/// General extraction: every `key='value'` pair in the block.
///
/// Keys are word characters (alphanumeric or underscore); values run to the
/// next single quote. Values are stored raw — no percent-decoding here.
pub fn parse_fields(metadata: &str) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    let mut rest = metadata;
    while let Some(eq) = rest.find("='") {
        let key: String = rest[..eq]
            .chars()
            .rev()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let after = &rest[eq + 2..];
        let Some(close) = after.find('\'') else {
            break; // unterminated value
        };
        if !key.is_empty() {
            fields.push((key, after[..close].to_string()));
        }
        rest = &after[close + 1..];
    }
    fields
}
