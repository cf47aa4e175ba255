use serde::Serialize;
use serde_json::{ Map, Value };

pub const MAX_SYMPTOMS_CHARS: usize = 2000;
pub const MAX_HISTORY_TURNS: usize = 12;
pub const MAX_TURN_CHARS: usize = 800;
pub const UNKNOWN: &str = "Unknown";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Anything other than "assistant" is labeled as the patient.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("assistant") => Role::Assistant,
            _ => Role::User,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    fn from_value(value: &Value) -> Self {
        let role = Role::from_label(value.get("role").and_then(Value::as_str));
        let content = value
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self { role, content }
    }
}

/// One `/predict` call, normalized from an arbitrary JSON body.
///
/// Parsing never fails: a body that is not a JSON object yields an empty request,
/// which then fails the symptoms check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriageRequest {
    /// Trimmed and capped at `MAX_SYMPTOMS_CHARS`. Empty when missing.
    pub symptoms: String,
    pub age: String,
    pub gender: String,
    /// `None` when the caller sent no list.
    pub history: Option<Vec<Turn>>,
}

impl Default for TriageRequest {
    fn default() -> Self {
        Self {
            symptoms: String::new(),
            age: UNKNOWN.to_string(),
            gender: UNKNOWN.to_string(),
            history: None,
        }
    }
}

impl TriageRequest {
    pub fn from_json_slice(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => Self::from_object(&map),
            _ => Self::default(),
        }
    }

    fn from_object(map: &Map<String, Value>) -> Self {
        let symptoms = map
            .get("symptoms")
            .and_then(scalar_text)
            .map(|s| truncate_chars(s.trim(), MAX_SYMPTOMS_CHARS).trim_end().to_string())
            .unwrap_or_default();

        let history = match map.get("history") {
            Some(Value::Array(items)) => Some(items.iter().map(Turn::from_value).collect()),
            _ => None,
        };

        Self {
            symptoms,
            age: map.get("age").and_then(scalar_text).unwrap_or_else(|| UNKNOWN.to_string()),
            gender: map.get("gender").and_then(scalar_text).unwrap_or_else(|| UNKNOWN.to_string()),
            history,
        }
    }

    pub fn has_symptoms(&self) -> bool {
        !self.symptoms.is_empty()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Prefix of at most `max` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Serialize, Debug)]
pub struct PredictResponse {
    pub output: String,
}

#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: &'static str,
    pub mock_mode: bool,
}
