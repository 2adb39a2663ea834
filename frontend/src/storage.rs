use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;

use crate::models::{Conversation, Settings};

pub const CONVERSATIONS_KEY: &str = "hyper-chat-2003-conversations";
pub const SETTINGS_KEY: &str = "hyper-chat-2003-settings";

/// String key-value persistence, shaped like the browser's `localStorage`.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    fn remove(&self, key: &str);
}

/// `window.localStorage`. Looked up on every call so the handle stays `Send`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    fn local_storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::local_storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let storage = Self::local_storage().ok_or("localStorage is unavailable")?;
        storage
            .set_item(key, value)
            .map_err(|e| format!("localStorage write failed: {e:?}"))
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = Self::local_storage() {
            let _ = storage.remove_item(key);
        }
    }
}

/// In-memory store. Clones share the same entries.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

// ── Typed blobs ──────────────────────────────────────────────────────────────

/// Stored conversation list; missing or unreadable data yields an empty list.
pub fn load_conversations(store: &impl KeyValueStore) -> Vec<Conversation> {
    let Some(raw) = store.get(CONVERSATIONS_KEY) else {
        return Vec::new();
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        log::warn!("Discarding unreadable conversation history: {e}");
        Vec::new()
    })
}

pub fn save_conversations(store: &impl KeyValueStore, conversations: &[Conversation]) {
    write_json(store, CONVERSATIONS_KEY, &conversations);
}

/// Stored settings merged over the defaults.
pub fn load_settings(store: &impl KeyValueStore) -> Settings {
    store
        .get(SETTINGS_KEY)
        .and_then(|raw| serde_json::from_str::<Settings>(&raw).ok())
        .unwrap_or_default()
        .sanitized()
}

pub fn save_settings(store: &impl KeyValueStore, settings: &Settings) {
    write_json(store, SETTINGS_KEY, settings);
}

pub fn clear_all(store: &impl KeyValueStore) {
    store.remove(CONVERSATIONS_KEY);
    store.remove(SETTINGS_KEY);
}

fn write_json<T: Serialize + ?Sized>(store: &impl KeyValueStore, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(|e| e.to_string())
        .and_then(|json| store.set(key, &json));
    if let Err(e) = result {
        log::error!("Failed to save {key}: {e}");
    }
}
