//! Bounded collection of a child's output streams.

/// Appended to a stream that hit the capture ceiling.
pub const TRUNCATION_MARKER: &str = "\n...[output truncated]";

/// Text collected from one stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub text: String,
    pub truncated: bool,
}

/// Accumulates at most `limit` bytes of a stream and counts the rest.
#[derive(Debug)]
pub struct StreamCapture {
    buf: Vec<u8>,
    limit: usize,
    truncated: bool,
    discarded: u64,
}

impl StreamCapture {
    pub fn new(limit: usize) -> Self {
        Self {
            buf: Vec::with_capacity(limit.min(8 * 1024)),
            limit,
            truncated: false,
            discarded: 0,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.buf.len());
        if chunk.len() > room {
            self.buf.extend_from_slice(&chunk[..room]);
            self.truncated = true;
            self.discarded += (chunk.len() - room) as u64;
        } else {
            self.buf.extend_from_slice(chunk);
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Bytes dropped after the ceiling was reached.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn finish(self) -> CapturedOutput {
        let mut text = String::from_utf8_lossy(&self.buf).into_owned();
        // Lossy decoding can grow the text past the ceiling.
        if text.len() > self.limit {
            let mut cut = self.limit;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }
        if self.truncated {
            text.push_str(TRUNCATION_MARKER);
        }
        CapturedOutput {
            text,
            truncated: self.truncated,
        }
    }
}
