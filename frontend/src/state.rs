use leptos::prelude::*;
use leptos::task::spawn_local;

use hyper_chat_frontend::models::Settings;
use hyper_chat_frontend::storage::BrowserStorage;
use hyper_chat_frontend::store::ChatStore;
use hyper_chat_frontend::turn::{self, StoreHandle};

use crate::api::{API_BASE, HttpRelay};

/// Shared application state, provided via Leptos context.
///
/// The whole [`ChatStore`] sits in one signal; components read it with
/// `store.with(..)` and every mutation goes through a store operation.
#[derive(Clone, Copy)]
pub struct AppState {
    pub store: RwSignal<ChatStore<BrowserStorage>>,
}

/// Lets the send driver update the store from inside a spawned task.
struct SignalStore(RwSignal<ChatStore<BrowserStorage>>);

impl StoreHandle<BrowserStorage> for SignalStore {
    fn update<R>(&self, f: impl FnOnce(&mut ChatStore<BrowserStorage>) -> R) -> Option<R> {
        self.0.try_update(f)
    }
}

fn now_ms() -> i64 {
    js_sys::Date::now() as i64
}

/// Minutes east of UTC for the browser's time zone.
pub fn local_offset_minutes() -> i32 {
    -(js_sys::Date::new_0().get_timezone_offset() as i32)
}

impl AppState {
    /// Load persisted state and provide it in the current Leptos context.
    pub fn provide() -> Self {
        let state = Self {
            store: RwSignal::new(ChatStore::load(BrowserStorage)),
        };
        provide_context(state);
        state
    }

    /// Send a message and stream the reply into the store.
    pub fn send_message(&self, text: String) {
        let handle = SignalStore(self.store);
        spawn_local(async move {
            let relay = HttpRelay::new(API_BASE);
            if !turn::send_message(&handle, &relay, &text, now_ms).await {
                log::debug!("Send ignored: empty input or reply already in progress");
            }
        });
    }

    pub fn create_conversation(&self) {
        self.store.update(|s| {
            s.create_conversation(now_ms());
        });
    }

    pub fn select_conversation(&self, id: &str) {
        self.store.update(|s| {
            s.select_conversation(id);
        });
    }

    pub fn rename_conversation(&self, id: &str, title: &str) {
        self.store.update(|s| {
            s.rename_conversation(id, title);
        });
    }

    pub fn delete_conversation(&self, id: &str) {
        self.store.update(|s| s.delete_conversation(id));
    }

    pub fn update_settings(&self, settings: Settings) {
        self.store.update(|s| s.update_settings(settings));
    }

    pub fn clear_all(&self) {
        self.store.update(|s| s.clear_all());
    }
}
