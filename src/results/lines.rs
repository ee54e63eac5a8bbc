/// Reassembles newline-terminated lines from arbitrarily split byte chunks.
///
/// Bytes after the last `\n` stay buffered until a later chunk terminates
/// them; an unterminated tail is never handed out.
#[derive(Debug, Default)]
pub struct LineAssembler {
    partial: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completes, without the `\n`
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        // Bytes already buffered hold no newline, so only the new chunk is scanned
        let scan_from = self.partial.len();
        self.partial.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0usize;
        for (offset, byte) in self.partial[scan_from..].iter().enumerate() {
            if *byte == b'\n' {
                let idx = scan_from + offset;
                lines.push(self.partial[start..idx].to_vec());
                start = idx + 1;
            }
        }

        if start > 0 {
            self.partial.drain(0..start);
        }

        lines
    }

    /// Bytes held back waiting for a line terminator
    pub fn pending(&self) -> usize {
        self.partial.len()
    }
}

/// Strip trailing whitespace, including a `\r` left by CRLF endings
pub fn trim_line(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    &line[..end]
}
