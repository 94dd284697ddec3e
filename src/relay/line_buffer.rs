//! Reassembly of newline-terminated lines from arbitrarily split byte chunks.
//!
//! State is the bytes received since the last `\n`. Each [`LineBuffer::push`]
//! appends a chunk and drains every line it completes. Bytes already searched
//! for a newline are not searched again. Whatever remains when the upstream
//! closes is dropped with the buffer; there is no final flush.

use bytes::{Buf, BytesMut};

/// Accumulates raw bytes and yields complete lines.
///
/// Splitting happens on bytes, so a multi-byte UTF-8 character divided across
/// two network reads is decoded only once its line is whole.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
    /// Prefix of `buf` known to contain no `\n`.
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the lines it completed, without their `\n`
    /// (a trailing `\r` is also stripped).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            let line = self.buf.split_to(self.scanned + pos);
            self.buf.advance(1);
            self.scanned = 0;

            let line = line.strip_suffix(b"\r").unwrap_or(&line[..]);
            lines.push(String::from_utf8_lossy(line).into_owned());
        }
        self.scanned = self.buf.len();
        lines
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.buf.len()
    }
}
