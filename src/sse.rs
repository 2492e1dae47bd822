//! Incremental reader for `text/event-stream` bodies.
//!
//! Used for both the Gemini `alt=sse` stream and the relay's own stream when
//! read back by the client.

#[derive(Debug, thiserror::Error)]
pub enum SseError {
    #[error("SSE line is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Minimal SSE parser.
///
/// - Buffers raw bytes until a full line is available, so multi-byte
///   characters split across network chunks decode correctly
/// - Joins consecutive `data:` lines with `\n`
/// - Emits one payload per blank-line-terminated event
/// - Ignores `event:`, `id:`, `retry:` and comment lines
#[derive(Debug, Default)]
pub struct SseParser {
    buf: Vec<u8>,
    data: Option<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes and collect every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, SseError>> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if line.is_empty() {
                if let Some(data) = self.data.take() {
                    out.push(Ok(data));
                }
                continue;
            }

            match std::str::from_utf8(&line) {
                Ok(s) => self.field(s),
                Err(e) => out.push(Err(e.into())),
            }
        }

        out
    }

    /// Flush an event left open when the body ended without a blank line.
    pub fn finish(&mut self) -> Option<Result<String, SseError>> {
        if !self.buf.is_empty() {
            let line = std::mem::take(&mut self.buf);
            match std::str::from_utf8(&line) {
                Ok(s) => self.field(s.trim_end_matches('\r')),
                Err(e) => return Some(Err(e.into())),
            }
        }
        self.data.take().map(Ok)
    }

    fn field(&mut self, line: &str) {
        let Some(rest) = line.strip_prefix("data:") else {
            return;
        };
        // A single leading space after the colon is not part of the value.
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        match &mut self.data {
            Some(data) => {
                data.push('\n');
                data.push_str(rest);
            }
            None => self.data = Some(rest.to_string()),
        }
    }
}
