use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const MAX_TEMPERATURE: f64 = 2.0;
pub const NEW_CONVERSATION_TITLE: &str = "New Chat";

const TITLE_MAX_CHARS: usize = 30;
const TITLE_ELLIPSIS: &str = "...";

/// Models the settings panel offers, with display names.
pub const AVAILABLE_MODELS: [(&str, &str); 4] = [
    ("gpt-4o", "GPT-4o (Recommended)"),
    ("gpt-4o-mini", "GPT-4o Mini"),
    ("gpt-4-turbo", "GPT-4 Turbo"),
    ("gpt-3.5-turbo", "GPT-3.5 Turbo"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A finished chat message as kept in local storage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: new_id(),
            role,
            content: content.into(),
            timestamp,
            is_error: None,
        }
    }

    /// An assistant turn that reports a failure instead of a reply.
    pub fn error(content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            is_error: Some(true),
            ..Self::new(Role::Assistant, content, timestamp)
        }
    }

    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub created_at: i64,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(created_at: i64) -> Self {
        Self {
            id: new_id(),
            title: NEW_CONVERSATION_TITLE.to_string(),
            created_at,
            messages: Vec::new(),
        }
    }
}

/// Title for a conversation whose first user message is `text`.
pub fn derive_title(text: &str) -> String {
    if text.chars().count() > TITLE_MAX_CHARS {
        let prefix: String = text.chars().take(TITLE_MAX_CHARS).collect();
        format!("{prefix}{TITLE_ELLIPSIS}")
    } else {
        text.to_string()
    }
}

/// Global chat settings. Missing fields in stored JSON keep their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: String,
    pub temperature: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl Settings {
    /// Clamps the temperature into `[0, 2]` and replaces unknown models.
    pub fn sanitized(self) -> Self {
        let model = if AVAILABLE_MODELS.iter().any(|(id, _)| *id == self.model) {
            self.model
        } else {
            DEFAULT_MODEL.to_string()
        };
        let temperature = if self.temperature.is_finite() {
            self.temperature.clamp(0.0, MAX_TEMPERATURE)
        } else {
            DEFAULT_TEMPERATURE
        };
        Self { model, temperature }
    }
}

// ── Relay wire types ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

/// Body for `POST /api/chat`. Ids and timestamps never leave the browser.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<WireMessage>,
    pub model: String,
    pub temperature: f64,
}

impl ChatRequest {
    pub fn new(messages: &[Message], settings: &Settings) -> Self {
        Self {
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect(),
            model: settings.model.clone(),
            temperature: settings.temperature,
        }
    }
}

/// `{"error": "..."}` returned by the relay on failure.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// One `data:` payload of the relay stream.
#[derive(Clone, Debug, Deserialize)]
pub struct DeltaFrame {
    pub content: String,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
