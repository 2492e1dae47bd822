use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Most recent turns replayed to the provider as context.
pub const HISTORY_LIMIT: usize = 12;

/// Answer returned when the provider produced no text.
pub const NO_ANSWER: &str = "No answer";

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} {value:?} (expected one of: {expected})")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            other => Err(UnknownVariant {
                kind: "level",
                value: other.to_string(),
                expected: "beginner, intermediate, advanced",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    #[default]
    Simple,
    Exam,
    WithExamples,
}

impl Style {
    pub fn as_str(self) -> &'static str {
        match self {
            Style::Simple => "simple",
            Style::Exam => "exam",
            Style::WithExamples => "with-examples",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Style::Simple),
            "exam" => Ok(Style::Exam),
            "with-examples" => Ok(Style::WithExamples),
            other => Err(UnknownVariant {
                kind: "style",
                value: other.to_string(),
                expected: "simple, exam, with-examples",
            }),
        }
    }
}

/// Author of a transcript turn.
///
/// Decoding is total: `"assistant"` is the model side and every other value,
/// including a missing or `null` role, is treated as the human side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum TurnRole {
    #[default]
    User,
    Assistant,
}

impl From<Option<String>> for TurnRole {
    fn from(role: Option<String>) -> Self {
        match role.as_deref() {
            Some("assistant") => TurnRole::Assistant,
            _ => TurnRole::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(default)]
    pub role: TurnRole,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
}

fn null_as_empty<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Option::<String>::deserialize(d).map(Option::unwrap_or_default)
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/teach` and `POST /api/teach/stream`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeachRequest {
    pub topic: String,
    pub level: Level,
    pub style: Style,
    pub question: String,
    pub history: Vec<Turn>,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid teach request: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wire form: every field may be absent or `null`.
#[derive(Debug, Deserialize)]
struct RawTeachRequest {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    level: Option<Level>,
    #[serde(default)]
    style: Option<Style>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    history: Option<Vec<Turn>>,
}

impl From<RawTeachRequest> for TeachRequest {
    fn from(raw: RawTeachRequest) -> Self {
        Self {
            topic: raw.topic.unwrap_or_default(),
            level: raw.level.unwrap_or_default(),
            style: raw.style.unwrap_or_default(),
            question: raw.question.unwrap_or_default(),
            history: raw.history.unwrap_or_default(),
        }
    }
}

impl<'de> Deserialize<'de> for TeachRequest {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        RawTeachRequest::deserialize(d).map(Self::from)
    }
}

impl TeachRequest {
    /// Validate a request body.
    ///
    /// Missing fields (or an empty body) fall back to defaults; wrong JSON
    /// types and unknown level/style values are rejected.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(body)?)
    }
}

/// Body of a successful `POST /api/teach`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeachAnswer {
    pub answer: String,
}

impl TeachAnswer {
    pub fn new(text: String) -> Self {
        let answer = if text.is_empty() {
            NO_ANSWER.to_string()
        } else {
            text
        };
        Self { answer }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_decodes_to_defaults() {
        let req = TeachRequest::decode(b"{}").unwrap();
        assert_eq!(req, TeachRequest::default());
        assert_eq!(req.level, Level::Beginner);
        assert_eq!(req.style, Style::Simple);
    }

    #[test]
    fn nulls_are_treated_as_missing() {
        let req = TeachRequest::decode(br#"{"topic":null,"level":null,"history":null}"#).unwrap();
        assert_eq!(req, TeachRequest::default());
    }

    #[test]
    fn decodes_full_request() {
        let req = TeachRequest::decode(
            br#"{
                "topic": "Binary Search",
                "level": "advanced",
                "style": "with-examples",
                "question": "Why log n?",
                "history": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(req.topic, "Binary Search");
        assert_eq!(req.level, Level::Advanced);
        assert_eq!(req.style, Style::WithExamples);
        assert_eq!(req.question, "Why log n?");
        assert_eq!(req.history, vec![Turn::user("hi"), Turn::assistant("hello")]);
    }

    #[test]
    fn any_non_assistant_role_is_the_user_side() {
        let req = TeachRequest::decode(
            br#"{"history":[{"role":"system","content":"a"},{"role":"model","content":"b"},{"role":"assistant"}]}"#,
        )
        .unwrap();
        let roles: Vec<_> = req.history.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![TurnRole::User, TurnRole::User, TurnRole::Assistant]);
        assert_eq!(req.history[2].content, "");
    }

    #[test]
    fn missing_or_null_role_is_the_user_side() {
        let req = TeachRequest::decode(
            br#"{"history":[{"content":"hi"},{"role":null,"content":"there"},{"role":"assistant","content":null}]}"#,
        )
        .unwrap();
        assert_eq!(
            req.history,
            vec![Turn::user("hi"), Turn::user("there"), Turn::assistant("")]
        );
    }

    #[test]
    fn empty_body_decodes_to_defaults() {
        for body in [&b""[..], b"  \n"] {
            assert_eq!(TeachRequest::decode(body).unwrap(), TeachRequest::default());
        }
        assert!(TeachRequest::decode(br#"{"history":[{"role":5}]}"#).is_err());
    }

    #[test]
    fn rejects_malformed_bodies() {
        let bodies: [&[u8]; 6] = [
            b"not json",
            br#"[1,2]"#,
            br#"{"level":"expert"}"#,
            br#"{"style":"poetry"}"#,
            br#"{"question":42}"#,
            br#"{"history":"everything"}"#,
        ];
        for body in bodies {
            assert!(TeachRequest::decode(body).is_err(), "accepted {:?}", String::from_utf8_lossy(body));
        }
    }

    #[test]
    fn request_serializes_with_wire_names() {
        let req = TeachRequest {
            topic: "t".into(),
            level: Level::Intermediate,
            style: Style::WithExamples,
            question: "q".into(),
            history: vec![Turn::assistant("a")],
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "topic": "t",
                "level": "intermediate",
                "style": "with-examples",
                "question": "q",
                "history": [{"role": "assistant", "content": "a"}]
            })
        );
        assert_eq!(TeachRequest::decode(value.to_string().as_bytes()).unwrap(), req);
    }

    #[test]
    fn level_and_style_parse_from_cli_values() {
        assert_eq!("advanced".parse::<Level>().unwrap(), Level::Advanced);
        assert_eq!("exam".parse::<Style>().unwrap(), Style::Exam);
        let err = "expert".parse::<Level>().unwrap_err();
        assert!(err.to_string().contains("beginner, intermediate, advanced"));
    }

    #[test]
    fn empty_answer_falls_back() {
        assert_eq!(TeachAnswer::new(String::new()).answer, NO_ANSWER);
        assert_eq!(TeachAnswer::new("42".into()).answer, "42");
    }
}
