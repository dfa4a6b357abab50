use chrono::{DateTime, Utc};

/// A complete line cut from the byte stream, not yet sequenced
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramedLine {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

/// Splits an unaligned byte stream into lines
///
/// Any of `\r\n`, `\r` and `\n` terminates a line. Bytes after the last
/// terminator are carried over and prefixed to the next chunk, so the output
/// does not depend on where chunk boundaries fall. Whitespace-only lines are
/// dropped.
#[derive(Debug, Default)]
pub struct LineFramer {
    /// Bytes of the current unterminated line
    carry: Vec<u8>,

    /// Previous chunk ended in `\r`; a leading `\n` belongs to that terminator
    pending_cr: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every line it completed
    pub fn push(&mut self, chunk: &[u8], now: DateTime<Utc>) -> Vec<FramedLine> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        if self.pending_cr {
            self.pending_cr = false;
            if let Some(stripped) = rest.strip_prefix(b"\n") {
                rest = stripped;
            }
        }

        let mut i = 0;
        while i < rest.len() {
            match rest[i] {
                b'\n' => {
                    self.emit(&mut lines, now);
                }
                b'\r' => {
                    self.emit(&mut lines, now);
                    match rest.get(i + 1) {
                        Some(b'\n') => i += 1,
                        Some(_) => {}
                        None => self.pending_cr = true,
                    }
                }
                b => self.carry.push(b),
            }
            i += 1;
        }

        lines
    }

    /// Emit the carried partial line, if any
    pub fn flush(&mut self, now: DateTime<Utc>) -> Option<FramedLine> {
        self.pending_cr = false;
        let mut lines = Vec::with_capacity(1);
        self.emit(&mut lines, now);
        lines.pop()
    }

    fn emit(&mut self, lines: &mut Vec<FramedLine>, now: DateTime<Utc>) {
        let bytes = std::mem::take(&mut self.carry);
        let text = String::from_utf8_lossy(&bytes);
        if text.trim().is_empty() {
            return;
        }
        lines.push(FramedLine {
            timestamp: now,
            text: text.into_owned(),
        });
    }
}
