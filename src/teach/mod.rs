//! Teaching requests, prompt shaping and the relay's stream events.

mod event;
mod request;
pub mod shaper;

pub use event::RelayEvent;
pub use request::{
    DecodeError, Level, Style, TeachAnswer, TeachRequest, Turn, TurnRole, HISTORY_LIMIT,
};
