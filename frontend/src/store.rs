use crate::models::{ChatRequest, Conversation, Message, Role, Settings, derive_title};
use crate::storage::{self, KeyValueStore};
use crate::turn::TurnOutcome;

/// A send that has been accepted and is waiting on the relay.
///
/// Carries the id of the conversation it belongs to, so the reply lands there
/// even if the user switched conversations meanwhile.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingTurn {
    pub conversation_id: String,
    pub request: ChatRequest,
}

/// All client state. Every mutation that changes conversations or settings is
/// written through to `storage` before returning.
#[derive(Debug)]
pub struct ChatStore<S> {
    storage: S,
    conversations: Vec<Conversation>,
    active_id: Option<String>,
    settings: Settings,
    generating: bool,
    streaming: String,
    streaming_in: Option<String>,
}

impl<S: KeyValueStore> ChatStore<S> {
    /// Restores conversations and settings; the first conversation becomes active.
    pub fn load(storage: S) -> Self {
        let conversations = storage::load_conversations(&storage);
        let settings = storage::load_settings(&storage);
        let active_id = conversations.first().map(|c| c.id.clone());
        Self {
            storage,
            conversations,
            active_id,
            settings,
            generating: false,
            streaming: String::new(),
            streaming_in: None,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        let id = self.active_id.as_deref()?;
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn streaming_text(&self) -> &str {
        &self.streaming
    }

    /// Conversation the in-flight reply belongs to.
    pub fn streaming_conversation(&self) -> Option<&str> {
        self.streaming_in.as_deref()
    }

    // ── Conversation CRUD ────────────────────────────────────────────────────

    /// Prepends an empty conversation, makes it active and returns its id.
    pub fn create_conversation(&mut self, now: i64) -> String {
        let conversation = Conversation::new(now);
        let id = conversation.id.clone();
        self.conversations.insert(0, conversation);
        self.active_id = Some(id.clone());
        self.persist_conversations();
        id
    }

    /// Unknown ids are ignored.
    pub fn select_conversation(&mut self, id: &str) -> bool {
        if self.conversations.iter().any(|c| c.id == id) {
            self.active_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn rename_conversation(&mut self, id: &str, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        let Some(conversation) = self.conversations.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        if conversation.title != title {
            conversation.title = title.to_string();
            self.persist_conversations();
        }
        true
    }

    /// Removes the conversation for good. Deleting the active one activates
    /// whatever is first afterwards.
    pub fn delete_conversation(&mut self, id: &str) {
        self.conversations.retain(|c| c.id != id);
        if self.active_id.as_deref() == Some(id) {
            self.active_id = self.conversations.first().map(|c| c.id.clone());
        }
        self.persist_conversations();
    }

    pub fn update_settings(&mut self, settings: Settings) {
        self.settings = settings.sanitized();
        storage::save_settings(&self.storage, &self.settings);
    }

    /// Wipes both stored blobs and resets conversations and settings.
    /// A turn still in flight finishes without a conversation to land in.
    pub fn clear_all(&mut self) {
        storage::clear_all(&self.storage);
        self.conversations.clear();
        self.active_id = None;
        self.settings = Settings::default();
    }

    // ── Sending ──────────────────────────────────────────────────────────────

    /// Records the user's message and enters the generating state.
    ///
    /// Returns `None` without touching anything when `text` is blank or a
    /// reply is already being generated.
    pub fn begin_send(&mut self, text: &str, now: i64) -> Option<PendingTurn> {
        let text = text.trim();
        if text.is_empty() || self.generating {
            return None;
        }

        let conversation_id = match self.active_conversation() {
            Some(c) => c.id.clone(),
            None => self.create_conversation(now),
        };
        let settings = self.settings.clone();
        let conversation = self.conversation_mut(&conversation_id)?;

        if conversation.messages.is_empty() {
            conversation.title = derive_title(text);
        }
        conversation.messages.push(Message::new(Role::User, text, now));
        let request = ChatRequest::new(&conversation.messages, &settings);

        self.persist_conversations();
        self.generating = true;
        self.streaming.clear();
        self.streaming_in = Some(conversation_id.clone());

        Some(PendingTurn {
            conversation_id,
            request,
        })
    }

    pub fn push_delta(&mut self, delta: &str) {
        self.streaming.push_str(delta);
    }

    /// Commits the outcome of `turn` and leaves the generating state.
    pub fn finish_send(&mut self, turn: PendingTurn, outcome: TurnOutcome, now: i64) {
        let message = match outcome {
            TurnOutcome::Completed(text) => Message::new(Role::Assistant, text, now),
            TurnOutcome::Rejected(error) | TurnOutcome::Failed(error) => Message::error(error, now),
        };

        match self.conversation_mut(&turn.conversation_id) {
            Some(conversation) => {
                conversation.messages.push(message);
                self.persist_conversations();
            }
            None => log::warn!(
                "Conversation {} was removed while its reply was streaming; dropping reply",
                turn.conversation_id
            ),
        }

        self.generating = false;
        self.streaming.clear();
        self.streaming_in = None;
    }

    fn conversation_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    fn persist_conversations(&self) {
        storage::save_conversations(&self.storage, &self.conversations);
    }
}
