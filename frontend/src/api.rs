use std::pin::Pin;

use futures::Stream;
use gloo_net::http::Request;
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::ReadableStreamDefaultReader;

use hyper_chat_frontend::models::{ChatRequest, ErrorBody};
use hyper_chat_frontend::turn::{RelayClient, RelayReply};

/// Base URL of the relay server.
pub const API_BASE: &str = "http://localhost:3000";

/// `fetch`-backed client for `POST /api/chat`.
pub struct HttpRelay {
    base: String,
}

impl HttpRelay {
    pub fn new(base: &str) -> Self {
        Self { base: base.trim_end_matches('/').to_string() }
    }
}

impl RelayClient for HttpRelay {
    type Body = Pin<Box<dyn Stream<Item = Result<Vec<u8>, String>>>>;

    async fn post_chat(&self, request: &ChatRequest) -> Result<RelayReply<Self::Body>, String> {
        let resp = Request::post(&format!("{}/api/chat", self.base))
            .json(request)
            .map_err(|e| format!("Serialize error: {e}"))?
            .send()
            .await
            .map_err(|e| format!("Network error: {e}"))?;

        if !resp.ok() {
            let status = resp.status();
            let error = resp.json::<ErrorBody>().await.ok().and_then(|b| b.error);
            return Ok(RelayReply::Rejected { status, error });
        }

        let body = resp.body().ok_or("Response has no body")?;
        let reader: ReadableStreamDefaultReader = body.get_reader().unchecked_into();
        Ok(RelayReply::Stream(Box::pin(read_chunks(reader))))
    }
}

/// Turns a body reader into a stream of byte chunks. The reader's lock is
/// released once the body ends or fails.
fn read_chunks(reader: ReadableStreamDefaultReader) -> impl Stream<Item = Result<Vec<u8>, String>> {
    futures::stream::unfold(Some(reader), |reader| async move {
        let reader = reader?;
        let result = match JsFuture::from(reader.read()).await {
            Ok(result) => result,
            Err(e) => {
                reader.release_lock();
                return Some((Err(format!("Stream read error: {e:?}")), None));
            }
        };

        let done = Reflect::get(&result, &JsValue::from_str("done"))
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        if done {
            reader.release_lock();
            return None;
        }

        match Reflect::get(&result, &JsValue::from_str("value")) {
            Ok(value) => Some((Ok(Uint8Array::new(&value).to_vec()), Some(reader))),
            Err(e) => {
                reader.release_lock();
                Some((Err(format!("Stream read error: {e:?}")), None))
            }
        }
    })
}
