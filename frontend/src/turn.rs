use futures::{Stream, StreamExt};

use crate::models::ChatRequest;
use crate::storage::KeyValueStore;
use crate::store::ChatStore;
use crate::stream::{EventDecoder, RelayEvent};

/// Shown when the relay rejects a request without saying why.
pub const GENERIC_FAILURE: &str = "Failed to get response";

/// What the relay answered to `POST /api/chat`.
pub enum RelayReply<B> {
    /// 2xx: the body is the event stream, as raw byte chunks.
    Stream(B),
    Rejected { status: u16, error: Option<String> },
}

/// Transport to the relay endpoint.
#[allow(async_fn_in_trait)]
pub trait RelayClient {
    type Body: Stream<Item = Result<Vec<u8>, String>>;

    async fn post_chat(&self, request: &ChatRequest) -> Result<RelayReply<Self::Body>, String>;
}

/// How a single turn ended.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnOutcome {
    Completed(String),
    /// The relay answered with a non-success status.
    Rejected(String),
    /// Network or stream failure.
    Failed(String),
}

/// Runs one relay call, calling `on_delta` for every piece of text as it
/// arrives. Always returns an outcome; it never panics on bad input.
pub async fn run_turn<C: RelayClient>(
    client: &C,
    request: &ChatRequest,
    mut on_delta: impl FnMut(&str),
) -> TurnOutcome {
    let body = match client.post_chat(request).await {
        Ok(RelayReply::Stream(body)) => body,
        Ok(RelayReply::Rejected { status, error }) => {
            log::warn!("Relay rejected chat request with status {status}");
            return TurnOutcome::Rejected(error.unwrap_or_else(|| GENERIC_FAILURE.to_string()));
        }
        Err(e) => {
            log::error!("Relay request failed: {e}");
            return TurnOutcome::Failed(e);
        }
    };

    let mut body = std::pin::pin!(body);
    let mut decoder = EventDecoder::default();
    let mut text = String::new();
    let mut apply = |event: RelayEvent, text: &mut String| {
        if let RelayEvent::Delta(delta) = event {
            text.push_str(&delta);
            on_delta(&delta);
        }
    };

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                log::error!("Relay stream failed: {e}");
                return TurnOutcome::Failed(e);
            }
        };
        for event in decoder.push(&chunk) {
            apply(event, &mut text);
        }
    }
    if let Some(event) = decoder.finish() {
        apply(event, &mut text);
    }

    if decoder.malformed_count() > 0 {
        log::debug!("Skipped {} malformed stream line(s)", decoder.malformed_count());
    }
    TurnOutcome::Completed(text)
}

/// Access to a [`ChatStore`] that lives behind some shared cell.
/// Returns `None` when the store is no longer available.
pub trait StoreHandle<S> {
    fn update<R>(&self, f: impl FnOnce(&mut ChatStore<S>) -> R) -> Option<R>;
}

impl<S> StoreHandle<S> for std::cell::RefCell<ChatStore<S>> {
    fn update<R>(&self, f: impl FnOnce(&mut ChatStore<S>) -> R) -> Option<R> {
        Some(f(&mut self.borrow_mut()))
    }
}

/// The whole send operation: record the user message, stream the reply into
/// the store, then commit it. `now` supplies epoch milliseconds.
///
/// Returns `false` when the send was refused (blank text or already generating).
pub async fn send_message<H, S, C>(handle: &H, client: &C, text: &str, now: impl Fn() -> i64) -> bool
where
    H: StoreHandle<S>,
    S: KeyValueStore,
    C: RelayClient,
{
    let Some(turn) = handle.update(|store| store.begin_send(text, now())).flatten() else {
        return false;
    };

    let outcome = run_turn(client, &turn.request, |delta| {
        handle.update(|store| store.push_delta(delta));
    })
    .await;

    handle.update(|store| store.finish_send(turn, outcome, now()));
    true
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use futures::executor::block_on;
    use futures::stream;

    use super::*;
    use crate::models::Role;
    use crate::storage::{MemoryStore, load_conversations};

    type Chunks = Vec<Result<Vec<u8>, String>>;

    enum Script {
        Stream(Chunks),
        Rejected(u16, Option<String>),
        Unreachable(String),
    }

    struct ScriptedRelay {
        script: Script,
        calls: Cell<usize>,
        last_request: RefCell<Option<ChatRequest>>,
    }

    impl ScriptedRelay {
        fn new(script: Script) -> Self {
            Self { script, calls: Cell::new(0), last_request: RefCell::new(None) }
        }

        fn streaming(chunks: &[&str]) -> Self {
            Self::new(Script::Stream(
                chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect(),
            ))
        }
    }

    impl RelayClient for ScriptedRelay {
        type Body = stream::Iter<std::vec::IntoIter<Result<Vec<u8>, String>>>;

        async fn post_chat(&self, request: &ChatRequest) -> Result<RelayReply<Self::Body>, String> {
            self.calls.set(self.calls.get() + 1);
            *self.last_request.borrow_mut() = Some(request.clone());
            match &self.script {
                Script::Stream(chunks) => Ok(RelayReply::Stream(stream::iter(chunks.clone()))),
                Script::Rejected(status, error) => Ok(RelayReply::Rejected {
                    status: *status,
                    error: error.clone(),
                }),
                Script::Unreachable(e) => Err(e.clone()),
            }
        }
    }

    fn clock() -> impl Fn() -> i64 {
        let ticks = Cell::new(1_000);
        move || {
            ticks.set(ticks.get() + 1);
            ticks.get()
        }
    }

    fn new_store() -> (RefCell<ChatStore<MemoryStore>>, MemoryStore) {
        let backing = MemoryStore::default();
        (RefCell::new(ChatStore::load(backing.clone())), backing)
    }

    #[test]
    fn hello_there_is_accumulated_and_persisted() {
        let (store, backing) = new_store();
        let relay = ScriptedRelay::streaming(&[
            "data: {\"content\":\"Hello\"}\n\n",
            "data: {\"content\":\" there\"}\n\n",
            "data: [DONE]\n\n",
        ]);

        let mut seen = Vec::new();
        let request = store.borrow_mut().begin_send("hi", 1).unwrap();
        let outcome = block_on(run_turn(&relay, &request.request, |d| seen.push(d.to_string())));
        assert_eq!(outcome, TurnOutcome::Completed("Hello there".into()));
        assert_eq!(seen, vec!["Hello", " there"]);
        store.borrow_mut().finish_send(request, outcome, 2);

        let persisted = load_conversations(&backing);
        let messages = &persisted[0].messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "Hello there");
        assert!(!messages[1].is_error());
    }

    #[test]
    fn send_message_sends_full_history_with_settings() {
        let (store, _) = new_store();
        let relay = ScriptedRelay::streaming(&["data: {\"content\":\"one\"}\n\n"]);
        let now = clock();

        assert!(block_on(send_message(&store, &relay, "first", &now)));
        assert!(block_on(send_message(&store, &relay, "second", &now)));

        let request = relay.last_request.borrow().clone().unwrap();
        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(request.messages[1].content, "one");
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.temperature, 0.7);
    }

    #[test]
    fn generating_flag_is_set_exactly_while_a_send_is_in_flight() {
        let (store, _) = new_store();
        let relay = ScriptedRelay::streaming(&[
            "data: {\"content\":\"a\"}\n\n",
            "data: {\"content\":\"b\"}\n\n",
        ]);
        let observed = RefCell::new(Vec::new());

        struct Probe<'a> {
            inner: &'a RefCell<ChatStore<MemoryStore>>,
            observed: &'a RefCell<Vec<bool>>,
        }
        impl StoreHandle<MemoryStore> for Probe<'_> {
            fn update<R>(&self, f: impl FnOnce(&mut ChatStore<MemoryStore>) -> R) -> Option<R> {
                let mut store = self.inner.borrow_mut();
                self.observed.borrow_mut().push(store.is_generating());
                Some(f(&mut store))
            }
        }

        assert!(!store.borrow().is_generating());
        let probe = Probe { inner: &store, observed: &observed };
        assert!(block_on(send_message(&probe, &relay, "go", clock())));

        // begin_send sees idle, both deltas and finish_send see generating.
        assert_eq!(*observed.borrow(), vec![false, true, true, true]);
        assert!(!store.borrow().is_generating());
        assert_eq!(store.borrow().streaming_text(), "");
    }

    #[test]
    fn n_sends_yield_two_n_alternating_messages() {
        let (store, _) = new_store();
        let ok = ScriptedRelay::streaming(&["data: {\"content\":\"sure\"}\n\n"]);
        let rejected = ScriptedRelay::new(Script::Rejected(500, None));
        let now = clock();

        for i in 0..5 {
            let relay = if i == 2 { &rejected } else { &ok };
            assert!(block_on(send_message(&store, relay, &format!("q{i}"), &now)));
        }

        let store = store.borrow();
        let messages = &store.active_conversation().unwrap().messages;
        assert_eq!(messages.len(), 10);
        for pair in messages.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
        }
        assert!(messages[5].is_error());
        assert_eq!(messages[5].content, GENERIC_FAILURE);
    }

    #[test]
    fn blank_text_never_reaches_the_relay() {
        let (store, _) = new_store();
        let relay = ScriptedRelay::streaming(&[]);

        assert!(!block_on(send_message(&store, &relay, "   ", clock())));
        assert_eq!(relay.calls.get(), 0);
        assert!(store.borrow().conversations().is_empty());
    }

    #[test]
    fn relay_rejection_becomes_error_message() {
        let (store, backing) = new_store();
        let relay = ScriptedRelay::new(Script::Rejected(
            429,
            Some("API Error: 429 - rate limited".into()),
        ));

        assert!(block_on(send_message(&store, &relay, "hi", clock())));

        let persisted = load_conversations(&backing);
        let reply = &persisted[0].messages[1];
        assert!(reply.is_error());
        assert_eq!(reply.role, Role::Assistant);
        assert!(reply.content.contains("429") && reply.content.contains("rate limited"));
        assert!(!store.borrow().is_generating());
    }

    #[test]
    fn network_failure_becomes_error_message() {
        let (store, _) = new_store();
        let relay = ScriptedRelay::new(Script::Unreachable("Network error: connection refused".into()));

        assert!(block_on(send_message(&store, &relay, "hi", clock())));

        let store = store.borrow();
        let reply = &store.active_conversation().unwrap().messages[1];
        assert!(reply.is_error());
        assert_eq!(reply.content, "Network error: connection refused");
        assert!(!store.is_generating());
    }

    #[test]
    fn mid_stream_failure_becomes_error_message() {
        let (store, _) = new_store();
        let relay = ScriptedRelay::new(Script::Stream(vec![
            Ok(b"data: {\"content\":\"par\"}\n\n".to_vec()),
            Err("Stream read error".into()),
        ]));

        assert!(block_on(send_message(&store, &relay, "hi", clock())));

        let store = store.borrow();
        let reply = &store.active_conversation().unwrap().messages[1];
        assert!(reply.is_error());
        assert_eq!(reply.content, "Stream read error");
        assert_eq!(store.streaming_text(), "");
    }

    #[test]
    fn malformed_line_does_not_interrupt_accumulation() {
        let relay = ScriptedRelay::streaming(&[
            "data: {\"content\":\"a\"}\n\n",
            "data: not-json\n\n",
            "data: {\"content\":\"b\"}\n\n",
        ]);
        let request = ChatRequest::new(&[], &Default::default());

        let outcome = block_on(run_turn(&relay, &request, |_| {}));
        assert_eq!(outcome, TurnOutcome::Completed("ab".into()));
    }

    #[test]
    fn multibyte_text_split_across_chunks_is_intact() {
        let frame = "data: {\"content\":\"日本\"}\n\n".as_bytes().to_vec();
        let cut = frame.iter().position(|b| *b >= 0x80).unwrap() + 2;
        let relay = ScriptedRelay::new(Script::Stream(vec![
            Ok(frame[..cut].to_vec()),
            Ok(frame[cut..].to_vec()),
        ]));
        let request = ChatRequest::new(&[], &Default::default());

        let outcome = block_on(run_turn(&relay, &request, |_| {}));
        assert_eq!(outcome, TurnOutcome::Completed("日本".into()));
    }
}
