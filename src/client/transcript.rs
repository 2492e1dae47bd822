use super::{ClientError, RelayClient};
use crate::teach::{shaper, Level, Style, TeachRequest, Turn};
use std::fmt::Display;
use tokio_util::sync::CancellationToken;

pub const GREETING: &str = "Hi! I'm your AI teacher. What topic should we learn today?";
pub const APOLOGY: &str = "Sorry, something went wrong.";

/// Lesson settings applied to every submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub topic: String,
    pub level: Level,
    pub style: Style,
}

/// One in-flight question, tagged with the sequence number the transcript
/// expects back.
#[derive(Debug, Clone)]
pub struct Submission {
    pub seq: u64,
    pub request: TeachRequest,
    pub cancel: CancellationToken,
}

impl Submission {
    /// Ask the relay; `None` if the submission was superseded first.
    pub async fn send(self, client: &RelayClient) -> Option<(u64, Result<String, ClientError>)> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            outcome = client.teach(&self.request) => Some((self.seq, outcome)),
        }
    }
}

#[derive(Debug)]
struct Pending {
    seq: u64,
    cancel: CancellationToken,
}

/// Ordered conversation for one session.
///
/// At most one submission is live: a new one cancels its predecessor, and
/// answers for anything but the live sequence number are discarded, so
/// replies can never be spliced out of order.
#[derive(Debug)]
pub struct Transcript {
    turns: Vec<Turn>,
    prefs: Preferences,
    pending: Option<Pending>,
    next_seq: u64,
}

impl Transcript {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            turns: vec![Turn::assistant(GREETING)],
            prefs,
            pending: None,
            next_seq: 0,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[cfg_attr(not(feature = "tui"), allow(dead_code))]
    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    #[cfg_attr(not(feature = "tui"), allow(dead_code))]
    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.prefs
    }

    #[cfg_attr(not(feature = "tui"), allow(dead_code))]
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Record the user's turn and build the request for it.
    /// Blank input is ignored.
    pub fn submit(&mut self, text: &str) -> Option<Submission> {
        if text.trim().is_empty() {
            return None;
        }
        if let Some(prev) = self.pending.take() {
            tracing::debug!(seq = prev.seq, "superseding pending question");
            prev.cancel.cancel();
        }

        self.turns.push(Turn::user(text));

        let topic = if self.prefs.topic.trim().is_empty() {
            text.to_string()
        } else {
            self.prefs.topic.clone()
        };
        let request = TeachRequest {
            topic,
            level: self.prefs.level,
            style: self.prefs.style,
            question: text.to_string(),
            history: shaper::recent(&self.turns).to_vec(),
        };

        self.next_seq += 1;
        let cancel = CancellationToken::new();
        self.pending = Some(Pending {
            seq: self.next_seq,
            cancel: cancel.clone(),
        });

        Some(Submission {
            seq: self.next_seq,
            request,
            cancel,
        })
    }

    /// The "teach me" shortcut for the current topic.
    pub fn teach_me(&mut self) -> Option<Submission> {
        let topic = match self.prefs.topic.trim() {
            "" => "any topic",
            t => t,
        };
        let prompt = format!("Explain {topic} in simple terms");
        self.submit(&prompt)
    }

    /// Splice in the outcome of submission `seq`.
    ///
    /// Returns `false` (and changes nothing) when `seq` is no longer the live
    /// submission. Failures are logged and shown as [`APOLOGY`].
    pub fn complete<E: Display>(&mut self, seq: u64, outcome: Result<String, E>) -> bool {
        if self.pending.as_ref().map(|p| p.seq) != Some(seq) {
            tracing::debug!(seq, "dropping stale answer");
            return false;
        }
        self.pending = None;

        let turn = match outcome {
            Ok(answer) => Turn::assistant(answer),
            Err(e) => {
                tracing::warn!(error = %e, "teach request failed");
                Turn::assistant(APOLOGY)
            }
        };
        self.turns.push(turn);
        true
    }

    /// Cancel anything in flight and start over from the greeting.
    #[cfg_attr(not(feature = "tui"), allow(dead_code))]
    pub fn clear(&mut self) {
        if let Some(prev) = self.pending.take() {
            prev.cancel.cancel();
        }
        self.turns = vec![Turn::assistant(GREETING)];
    }
}
