use crate::models::triage::{ truncate_chars, Role, Turn, MAX_HISTORY_TURNS, MAX_TURN_CHARS };

pub const NO_HISTORY_PLACEHOLDER: &str = "No previous conversation.";

/// Prior turns rendered for the prompt, plus how many follow-up questions the
/// assistant has already asked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationSummary {
    pub transcript: String,
    pub questions_asked: usize,
}

impl ConversationSummary {
    fn empty() -> Self {
        Self {
            transcript: NO_HISTORY_PLACEHOLDER.to_string(),
            questions_asked: 0,
        }
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "PATIENT",
        Role::Assistant => "AI",
    }
}

/// Only the first `MAX_HISTORY_TURNS` turns count, each capped at `MAX_TURN_CHARS`.
pub fn summarize_history(history: Option<&[Turn]>) -> ConversationSummary {
    let turns = match history {
        Some(turns) if !turns.is_empty() => turns,
        _ => return ConversationSummary::empty(),
    };

    let mut lines = Vec::new();
    let mut questions_asked = 0;
    for turn in turns.iter().take(MAX_HISTORY_TURNS) {
        let content = truncate_chars(&turn.content, MAX_TURN_CHARS);
        if content.trim().is_empty() {
            continue;
        }
        if turn.role == Role::Assistant && content.contains('?') {
            questions_asked += 1;
        }
        lines.push(format!("{}: {}", role_label(turn.role), content));
    }

    if lines.is_empty() {
        return ConversationSummary::empty();
    }

    ConversationSummary {
        transcript: lines.join("\n"),
        questions_asked,
    }
}
