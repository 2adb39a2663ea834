//! Conversation state, persistence and relay-stream handling for the chat
//! client. Everything here runs without a browser; the leptos UI in `main.rs`
//! only wires it to signals and `localStorage`.

pub mod format;
pub mod markdown;
pub mod models;
pub mod storage;
pub mod store;
pub mod stream;
pub mod turn;
