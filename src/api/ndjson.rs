//! Incremental decoder for the newline-delimited JSON status stream.
//!
//! Chunks from the transport do not respect line boundaries, so bytes are
//! buffered until a `\n` arrives. Lines that fail to parse are logged and
//! dropped; they never abort the stream.

use bytes::{Buf, BytesMut};

use super::models::ProgressUpdate;
use crate::domain::AppError;

/// Parse a single status line. Blank lines yield `Ok(None)`.
pub fn parse_status_line(line: &str) -> Result<Option<ProgressUpdate>, AppError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| AppError::Protocol(format!("{:?}: {}", line, e)))
}

#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: BytesMut,
    skipped: usize,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every update completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ProgressUpdate> {
        self.buffer.extend_from_slice(chunk);

        let mut updates = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            if let Some(update) = self.decode_line(&line) {
                updates.push(update);
            }
        }
        updates
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<ProgressUpdate> {
        let rest = self.buffer.split();
        self.decode_line(&rest)
    }

    /// Number of non-blank lines dropped because they were not valid updates.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<ProgressUpdate> {
        match parse_status_line(&String::from_utf8_lossy(raw)) {
            Ok(update) => update,
            Err(e) => {
                self.skipped += 1;
                log::warn!("Skipping line: {}", e);
                None
            }
        }
    }
}
