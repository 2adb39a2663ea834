use leptos::prelude::*;

use hyper_chat_frontend::format::format_date;

use crate::state::{AppState, local_offset_minutes};

/// Sidebar showing the conversation list, "New Chat" and "Clear all data".
#[component]
pub fn Sidebar() -> impl IntoView {
    let state = expect_context::<AppState>();
    let store = state.store;
    let offset = local_offset_minutes();

    let conversations = move || store.with(|s| s.conversations().to_vec());

    let on_clear = move |_| {
        let confirmed = window()
            .confirm_with_message("Delete all chat history and settings?\n\nThis cannot be undone.")
            .unwrap_or(false);
        if confirmed {
            state.clear_all();
        }
    };

    view! {
        <aside class="sidebar">
            <div class="sidebar-header">
                <h2>"HYPER CHAT 2003"</h2>
                <button class="new-chat-btn" on:click=move |_| state.create_conversation()>
                    "+ New Chat"
                </button>
            </div>
            <div class="conversation-list">
                {move || {
                    if conversations().is_empty() {
                        view! {
                            <div class="empty-list">"No conversations yet"</div>
                        }.into_any()
                    } else {
                        view! {
                            <For
                                each=conversations
                                // Title is part of the key so a rename re-renders the row.
                                key=|c| (c.id.clone(), c.title.clone())
                                let:conv
                            >
                                {
                                    let id_active = conv.id.clone();
                                    let id_select = conv.id.clone();
                                    let id_rename = conv.id.clone();
                                    let id_delete = conv.id.clone();
                                    let current_title = conv.title.clone();
                                    let date = format_date(conv.created_at, offset);
                                    view! {
                                        <div
                                            class="conversation-item"
                                            class:active=move || {
                                                store.with(|s| s.active_id() == Some(id_active.as_str()))
                                            }
                                            on:click=move |_| state.select_conversation(&id_select)
                                        >
                                            <span class="conversation-title">{conv.title}</span>
                                            <span class="conversation-date">{date}</span>
                                            <button
                                                class="icon-btn"
                                                title="Rename"
                                                on:click=move |ev| {
                                                    ev.stop_propagation();
                                                    if let Ok(Some(title)) = window()
                                                        .prompt_with_message_and_default("Rename conversation", &current_title)
                                                    {
                                                        state.rename_conversation(&id_rename, &title);
                                                    }
                                                }
                                            >
                                                "✎"
                                            </button>
                                            <button
                                                class="icon-btn"
                                                title="Delete"
                                                on:click=move |ev| {
                                                    ev.stop_propagation();
                                                    state.delete_conversation(&id_delete);
                                                }
                                            >
                                                "✕"
                                            </button>
                                        </div>
                                    }
                                }
                            </For>
                        }.into_any()
                    }
                }}
            </div>
            <button class="clear-btn" on:click=on_clear>
                "Clear all data"
            </button>
        </aside>
    }
}
