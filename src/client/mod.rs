//! Client side of the relay: HTTP calls and the conversation transcript.

mod relay;
mod transcript;

pub use relay::{ClientError, RelayClient, DEFAULT_API_BASE};
pub use transcript::{Preferences, Transcript};
