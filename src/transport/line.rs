//! Newline reassembly for stream transports
//!
//! Raw reads rarely line up with records: a TCP segment may carry half a
//! record or three of them. [`LineAssembler`] buffers bytes until a `\n`
//! arrives and hands out one trimmed line at a time.

use bytes::BytesMut;
use tracing::warn;

/// Longest unterminated run kept before the buffer is discarded
pub const DEFAULT_MAX_PENDING: usize = 4096;

/// Accumulates raw bytes and yields complete lines
#[derive(Debug)]
pub struct LineAssembler {
    buf: BytesMut,
    max_pending: usize,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_PENDING)
    }

    pub fn with_limit(max_pending: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(max_pending.min(DEFAULT_MAX_PENDING)),
            max_pending,
        }
    }

    /// Append freshly read bytes
    ///
    /// If the buffer exceeds the limit without containing a newline, the
    /// peer is not speaking the line protocol; the garbage is dropped.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);

        if self.buf.len() > self.max_pending && !self.buf.contains(&b'\n') {
            warn!(
                "Discarding {} bytes received without a line terminator",
                self.buf.len()
            );
            self.buf.clear();
        }
    }

    /// Take the next complete line, decoded permissively and trimmed
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.buf.iter().position(|&b| b == b'\n')?;
        let raw = self.buf.split_to(end + 1);
        Some(decode_permissive(&raw[..end]))
    }

    /// Bytes waiting for a terminator
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Decode bytes as UTF-8, dropping invalid sequences, and trim whitespace
pub fn decode_permissive(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let mut lines = LineAssembler::new();
        lines.push(b"1/2/3\n");
        assert_eq!(lines.next_line().as_deref(), Some("1/2/3"));
        assert_eq!(lines.next_line(), None);
        assert_eq!(lines.pending(), 0);
    }

    #[test]
    fn test_split_across_pushes() {
        let mut lines = LineAssembler::new();
        lines.push(b"1/2");
        assert_eq!(lines.next_line(), None);
        assert_eq!(lines.pending(), 3);

        lines.push(b"/3\r\n4/");
        assert_eq!(lines.next_line().as_deref(), Some("1/2/3"));
        assert_eq!(lines.next_line(), None);
        assert_eq!(lines.pending(), 2);
    }

    #[test]
    fn test_multiple_lines_in_one_push() {
        let mut lines = LineAssembler::new();
        lines.push(b"a\nb\n\nc\n");
        assert_eq!(lines.next_line().as_deref(), Some("a"));
        assert_eq!(lines.next_line().as_deref(), Some("b"));
        assert_eq!(lines.next_line().as_deref(), Some(""));
        assert_eq!(lines.next_line().as_deref(), Some("c"));
        assert_eq!(lines.next_line(), None);
    }

    #[test]
    fn test_invalid_utf8_dropped() {
        let mut lines = LineAssembler::new();
        lines.push(b"1/\xFF0/\xC3\n");
        assert_eq!(lines.next_line().as_deref(), Some("1/0/"));
    }

    #[test]
    fn test_valid_multibyte_kept() {
        assert_eq!(decode_permissive("  hız 12 \r".as_bytes()), "hız 12");
    }

    #[test]
    fn test_overflow_without_newline_discarded() {
        let mut lines = LineAssembler::with_limit(8);
        lines.push(b"12345");
        lines.push(b"67890");
        assert_eq!(lines.pending(), 0);

        lines.push(b"ok\n");
        assert_eq!(lines.next_line().as_deref(), Some("ok"));
    }

    #[test]
    fn test_overflow_with_newline_kept() {
        let mut lines = LineAssembler::with_limit(8);
        lines.push(b"12345\n67890");
        assert_eq!(lines.next_line().as_deref(), Some("12345"));
        assert_eq!(lines.pending(), 5);
    }

    #[test]
    fn test_clear() {
        let mut lines = LineAssembler::new();
        lines.push(b"partial");
        lines.clear();
        assert_eq!(lines.pending(), 0);
    }
}
