use crate::models::DeltaFrame;

const DATA_PREFIX: &[u8] = b"data: ";
const DONE_SENTINEL: &[u8] = b"[DONE]";
/// Longest line kept while waiting for its `\n`.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Event carried by one line of the relay's stream.
#[derive(Clone, Debug, PartialEq)]
pub enum RelayEvent {
    Delta(String),
    Done,
}

/// Incremental decoder for the relay's `text/event-stream` body.
///
/// Works on raw bytes and decodes a line only once its terminating `\n` has
/// arrived, so characters split across network reads stay intact. A line
/// longer than [`MAX_LINE_BYTES`] is skipped up to its next `\n` and counted
/// as malformed.
#[derive(Debug, Default)]
pub struct EventDecoder {
    pending: Vec<u8>,
    discarding: bool,
    malformed: usize,
}

impl EventDecoder {
    pub fn push(&mut self, mut chunk: &[u8]) -> Vec<RelayEvent> {
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

        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            events.extend(self.decode_line(&line[..pos]));
        }

        if self.pending.len() > MAX_LINE_BYTES {
            log::warn!("Dropping stream line longer than {MAX_LINE_BYTES} bytes");
            self.pending = Vec::new();
            self.discarding = true;
            self.malformed += 1;
        }
        events
    }

    /// Decodes a final line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<RelayEvent> {
        let rest = std::mem::take(&mut self.pending);
        self.decode_line(&rest)
    }

    /// Data lines skipped because their payload was not a delta frame.
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<RelayEvent> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let data = line.strip_prefix(DATA_PREFIX)?;
        if data == DONE_SENTINEL {
            return Some(RelayEvent::Done);
        }
        match serde_json::from_slice::<DeltaFrame>(data) {
            Ok(frame) if frame.content.is_empty() => None,
            Ok(frame) => Some(RelayEvent::Delta(frame.content)),
            Err(e) => {
                self.malformed += 1;
                log::debug!("Skipping malformed stream line: {e}");
                None
            }
        }
    }
}
