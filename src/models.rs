use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;

/// Models offered by the client, with their display names.
pub const AVAILABLE_MODELS: [(&str, &str); 4] = [
    ("gpt-4o", "GPT-4o (Recommended)"),
    ("gpt-4o-mini", "GPT-4o Mini"),
    ("gpt-4-turbo", "GPT-4 Turbo"),
    ("gpt-3.5-turbo", "GPT-3.5 Turbo"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

/// Body accepted by `POST /api/chat`.
///
/// `temperature` stays `None` only when the field is absent or `null`, so an
/// explicit `0` survives defaulting.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

impl ChatRequest {
    pub fn resolved_model(&self) -> String {
        self.model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MODEL)
            .to_string()
    }

    pub fn resolved_temperature(&self) -> f64 {
        self.temperature
            .unwrap_or(DEFAULT_TEMPERATURE)
            .clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
    }
}

// ── Upstream wire types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: String,
    pub messages: &'a [ChatMessage],
    pub temperature: f64,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionChunk {
    /// Text carried by the first choice, if any.
    pub fn first_delta(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.delta)
            .and_then(|d| d.content)
            .filter(|c| !c.is_empty())
    }
}

/// `{"error": {"message": ...}}` as returned by the upstream on failure.
#[derive(Debug, Default, Deserialize)]
pub struct UpstreamErrorBody {
    #[serde(default)]
    pub error: Option<UpstreamErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpstreamErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

// ── Downstream wire types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> ChatRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn absent_and_null_temperature_fall_back_to_default() {
        let req = parse(r#"{"messages":[]}"#);
        assert_eq!(req.resolved_temperature(), DEFAULT_TEMPERATURE);

        let req = parse(r#"{"messages":[],"temperature":null}"#);
        assert_eq!(req.resolved_temperature(), DEFAULT_TEMPERATURE);
    }

    #[test]
    fn explicit_zero_temperature_is_preserved() {
        let req = parse(r#"{"messages":[],"temperature":0}"#);
        assert_eq!(req.resolved_temperature(), 0.0);
    }

    #[test]
    fn temperature_is_clamped() {
        assert_eq!(parse(r#"{"messages":[],"temperature":3.5}"#).resolved_temperature(), 2.0);
        assert_eq!(parse(r#"{"messages":[],"temperature":-1}"#).resolved_temperature(), 0.0);
    }

    #[test]
    fn empty_or_missing_model_uses_default() {
        assert_eq!(parse(r#"{"messages":[]}"#).resolved_model(), DEFAULT_MODEL);
        assert_eq!(parse(r#"{"messages":[],"model":""}"#).resolved_model(), DEFAULT_MODEL);
        assert_eq!(parse(r#"{"messages":[],"model":"gpt-4o"}"#).resolved_model(), "gpt-4o");
    }

    #[test]
    fn unknown_role_is_rejected() {
        let res = serde_json::from_str::<ChatRequest>(
            r#"{"messages":[{"role":"tool","content":"x"}]}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn first_delta_skips_empty_content() {
        let chunk: CompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap();
        assert_eq!(chunk.first_delta(), None);

        let chunk: CompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(chunk.first_delta(), None);

        let chunk: CompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"hi"}}]}"#).unwrap();
        assert_eq!(chunk.first_delta().as_deref(), Some("hi"));
    }
}
