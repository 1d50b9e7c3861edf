//! Line framing for chunked response bodies
//!
//! Splits an arbitrary sequence of byte chunks into newline-terminated
//! logical lines. Chunk boundaries carry no meaning: a line may be cut
//! anywhere, including inside a multi-byte UTF-8 sequence.

use tracing::trace;

/// Incremental newline splitter
///
/// Holds at most one partial line between calls to [`feed`](Self::feed).
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Bytes of the unterminated trailing line; never contains `\n`
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completes, in order
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        // The buffer holds no newline, so only the new bytes need scanning
        let mut cursor = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.buffer[cursor..].iter().position(|&b| b == b'\n') {
            let end = cursor + offset;
            lines.push(decode_line(&self.buffer[start..end]));
            start = end + 1;
            cursor = start;
        }

        self.buffer.drain(..start);
        lines
    }

    /// Number of bytes held for the current partial line
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any unterminated trailing fragment at end of stream
    ///
    /// Returns the number of bytes discarded.
    pub fn finish(&mut self) -> usize {
        let discarded = self.buffer.len();
        if discarded > 0 {
            trace!(bytes = discarded, "Discarding unterminated trailing line");
        }
        self.buffer.clear();
        discarded
    }
}

/// Decode one line, tolerating a CRLF terminator
fn decode_line(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
