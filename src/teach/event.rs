use serde::{Deserialize, Serialize};

/// One `data:` payload of the teaching stream.
///
/// A stream is any number of `Delta`s followed by exactly one `Done` or
/// `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayEvent {
    Delta { delta: String },
    Done { done: bool },
    Error { error: String },
}

impl RelayEvent {
    pub const STREAM_ERROR: &'static str = "GenAI stream error";
    pub const STREAM_TIMEOUT: &'static str = "GenAI stream timeout";

    pub fn delta(text: impl Into<String>) -> Self {
        RelayEvent::Delta { delta: text.into() }
    }

    pub fn done() -> Self {
        RelayEvent::Done { done: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        RelayEvent::Error {
            error: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RelayEvent::Delta { .. })
    }
}
