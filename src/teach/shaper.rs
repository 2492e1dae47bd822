//! Turns a [`TeachRequest`] into the provider's prompt shape.
//!
//! Both relay endpoints go through [`shape`], so the directive always carries
//! the caller's level and style.

use super::{Level, Style, TeachRequest, Turn, TurnRole, HISTORY_LIMIT};
use crate::provider::{Content, GenerateRequest, Role};

const FALLBACK_TOPIC: &str = "general learning";
const FALLBACK_QUESTION: &str = "teach this topic simply.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapedPrompt {
    pub directive: String,
    pub contents: Vec<Content>,
}

impl ShapedPrompt {
    pub fn into_request(self, model: &str) -> GenerateRequest {
        GenerateRequest {
            model: model.to_string(),
            system_instruction: self.directive,
            contents: self.contents,
        }
    }
}

/// Persona and formatting guidance with `level` and `style` spelled out.
pub fn directive(level: Level, style: Style) -> String {
    [
        "You are a patient, friendly teacher for a computer science student.",
        "Always explain in simple language first, then go step by step.",
        "Use short sections, bullet points, and a tiny example.",
        "End with 3-question mini-quiz (with answers).",
        format!("Target level: {level}. Style: {style}.").as_str(),
        "If the user asks for code, provide idiomatic, commented code.",
    ]
    .join(" ")
}

/// The last [`HISTORY_LIMIT`] turns, oldest first.
pub fn recent(history: &[Turn]) -> &[Turn] {
    &history[history.len().saturating_sub(HISTORY_LIMIT)..]
}

pub fn shape(req: &TeachRequest) -> ShapedPrompt {
    let topic = non_blank(&req.topic)
        .or_else(|| non_blank(&req.question))
        .unwrap_or(FALLBACK_TOPIC);
    let question = non_blank(&req.question).unwrap_or(FALLBACK_QUESTION);

    let history = recent(&req.history);
    let mut contents = Vec::with_capacity(history.len() + 1);
    contents.push(Content {
        role: Role::User,
        text: format!("Topic: {topic}. Question: {question}"),
    });
    contents.extend(history.iter().map(|turn| Content {
        role: provider_role(turn.role),
        text: turn.content.clone(),
    }));

    ShapedPrompt {
        directive: directive(req.level, req.style),
        contents,
    }
}

fn provider_role(role: TurnRole) -> Role {
    match role {
        TurnRole::Assistant => Role::Model,
        TurnRole::User => Role::User,
    }
}

fn non_blank(s: &str) -> Option<&str> {
    (!s.trim().is_empty()).then_some(s)
}
