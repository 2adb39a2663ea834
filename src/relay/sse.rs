use bytes::Bytes;
use serde_json::json;

use crate::models::CompletionChunk;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";
/// Longest line kept while waiting for its `\n`.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits an incoming byte stream into complete lines.
///
/// Bytes after the last `\n` are carried over to the next read, so a
/// multi-byte character split between two reads is decoded only once it is
/// whole. A line that outgrows [`MAX_LINE_BYTES`] is dropped up to its next
/// `\n` and counted as an overflow.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    discarding: bool,
    overflows: u64,
}

impl LineBuffer {
    pub fn push(&mut self, mut chunk: &[u8]) -> Vec<String> {
        if self.discarding {
            match chunk.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    self.discarding = false;
                    chunk = &chunk[pos + 1..];
                }
                None => return Vec::new(),
            }
        }
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&line[..pos]));
        }

        if self.pending.len() > MAX_LINE_BYTES {
            self.pending = Vec::new();
            self.discarding = true;
            self.overflows += 1;
        }
        lines
    }

    /// Oversized lines dropped since the last call.
    pub fn take_overflows(&mut self) -> u64 {
        std::mem::take(&mut self.overflows)
    }

    /// Flushes whatever is left once the upstream body has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// What a single upstream line means for the downstream client.
#[derive(Debug, PartialEq)]
pub enum UpstreamLine {
    Delta(String),
    Done,
    /// Valid event without any text to forward (role preamble, usage, ...).
    Empty,
    /// Not a data line at all: blank separators, comments, `event:` fields.
    Ignored,
    Malformed,
}

pub fn classify(line: &str) -> UpstreamLine {
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return UpstreamLine::Ignored;
    };
    if data == DONE_SENTINEL {
        return UpstreamLine::Done;
    }
    match serde_json::from_str::<CompletionChunk>(data) {
        Ok(chunk) => chunk
            .first_delta()
            .map(UpstreamLine::Delta)
            .unwrap_or(UpstreamLine::Empty),
        Err(_) => UpstreamLine::Malformed,
    }
}

pub fn delta_frame(content: &str) -> Bytes {
    Bytes::from(format!("{DATA_PREFIX}{}\n\n", json!({ "content": content })))
}

pub fn done_frame() -> Bytes {
    Bytes::from(format!("{DATA_PREFIX}{DONE_SENTINEL}\n\n"))
}
