use leptos::ev;
use leptos::prelude::*;

use hyper_chat_frontend::format::format_time;
use hyper_chat_frontend::markdown::render_markdown;
use hyper_chat_frontend::models::{Message, Role};

use crate::components::settings::SettingsPanel;
use crate::state::{AppState, local_offset_minutes};

/// Main chat area with message history, streaming display, and input.
#[component]
pub fn ChatArea() -> impl IntoView {
    let state = expect_context::<AppState>();
    let store = state.store;
    let offset = local_offset_minutes();

    let title = move || {
        store.with(|s| {
            s.active_conversation()
                .map(|c| c.title.clone())
                .unwrap_or_else(|| "New conversation".to_string())
        })
    };
    let messages = move || {
        store.with(|s| {
            s.active_conversation()
                .map(|c| c.messages.clone())
                .unwrap_or_default()
        })
    };
    // Only shown while the reply belongs to the conversation on screen.
    let streaming = move || {
        store.with(|s| {
            let here = s.streaming_conversation().is_some()
                && s.streaming_conversation() == s.active_id();
            (s.is_generating() && here).then(|| s.streaming_text().to_string())
        })
    };

    // Keep the newest message in view as messages and deltas arrive.
    let container = NodeRef::<leptos::html::Div>::new();
    Effect::new(move |_| {
        let _ = store.with(|s| {
            let count = s.active_conversation().map_or(0, |c| c.messages.len());
            (count, s.streaming_text().len())
        });
        if let Some(div) = container.get() {
            div.set_scroll_top(div.scroll_height());
        }
    });

    view! {
        <main class="chat-area">
            <div class="chat-header">{title}</div>

            <div class="messages-container" node_ref=container>
                {move || {
                    if messages().is_empty() && streaming().is_none() {
                        view! {
                            <div class="empty-state">
                                "Send a message to start chatting"
                            </div>
                        }.into_any()
                    } else {
                        view! {
                            <For
                                each=messages
                                key=|m| m.id.clone()
                                let:msg
                            >
                                <MessageBubble message=msg offset=offset />
                            </For>
                            // Streaming message (assistant typing)
                            {move || {
                                streaming().map(|text| {
                                    view! {
                                        <div class="message assistant">
                                            <div class="role-label">"assistant"</div>
                                            <div class="streaming-cursor">{text}</div>
                                        </div>
                                    }
                                })
                            }}
                        }.into_any()
                    }
                }}
            </div>

            <SettingsPanel />
            <ChatInput />
        </main>
    }
}

/// A single chat message bubble.
#[component]
fn MessageBubble(message: Message, offset: i32) -> impl IntoView {
    let css_class = if message.is_error() {
        "message error"
    } else if message.role == Role::User {
        "message user"
    } else {
        "message assistant"
    };
    let label = format!(
        "{} · {}",
        message.role.as_str(),
        format_time(message.timestamp, offset)
    );
    let html = render_markdown(&message.content);

    view! {
        <div class=css_class>
            <div class="role-label">{label}</div>
            <div class="message-content" inner_html=html></div>
        </div>
    }
}

/// Chat input form with textarea and send button.
#[component]
fn ChatInput() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (input, set_input) = signal(String::new());

    let is_sending = move || state.store.with(|s| s.is_generating());

    let send = move || {
        let text = input.get().trim().to_string();
        if text.is_empty() || is_sending() {
            return;
        }
        set_input.set(String::new());
        state.send_message(text);
    };

    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    view! {
        <div class="input-area">
            <div class="input-row">
                <textarea
                    rows="1"
                    placeholder="Type a message… (Enter to send, Shift+Enter for newline)"
                    prop:value=input
                    on:input=move |ev| {
                        set_input.set(event_target_value(&ev));
                    }
                    on:keydown=on_keydown
                    disabled=is_sending
                />
                <button
                    class="send-btn"
                    on:click=move |_| send()
                    disabled=move || is_sending() || input.get().trim().is_empty()
                >
                    {move || if is_sending() { "Sending…" } else { "Send" }}
                </button>
            </div>
        </div>
    }
}
