//! Minimal Bot API stand-in for exercising the teloxide adapters.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use {
    axum::{
        Json, Router,
        body::Bytes,
        extract::State,
        http::{StatusCode, Uri},
        routing::post,
    },
    serde_json::{Value, json},
    tokio::sync::oneshot,
};

pub(crate) struct MockReply {
    status: StatusCode,
    body: Value,
}

impl MockReply {
    pub(crate) fn ok(result: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({ "ok": true, "result": result }),
        }
    }

    pub(crate) fn error(code: u16, description: &str) -> Self {
        Self {
            status: StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST),
            body: json!({ "ok": false, "error_code": code, "description": description }),
        }
    }

    pub(crate) fn retry_after(secs: u32) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: json!({
                "ok": false,
                "error_code": 429,
                "description": format!("Too Many Requests: retry after {secs}"),
                "parameters": { "retry_after": secs },
            }),
        }
    }
}

type Responder = Arc<dyn Fn(&str, &Value) -> MockReply + Send + Sync>;

#[derive(Clone)]
struct MockState {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
    responder: Responder,
}

/// A local HTTP server answering Bot API calls. Method names are passed to
/// the responder lowercased (`getupdates`, `sendmessage`, ...).
pub(crate) struct MockApi {
    state: MockState,
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockApi {
    pub(crate) async fn start(
        responder: impl Fn(&str, &Value) -> MockReply + Send + Sync + 'static,
    ) -> Self {
        let state = MockState {
            calls: Arc::new(Mutex::new(Vec::new())),
            responder: Arc::new(responder),
        };
        let app = Router::new()
            .route("/{*path}", post(handle))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("serve mock telegram api");
        });

        Self {
            state,
            addr,
            shutdown: Some(shutdown_tx),
        }
    }

    pub(crate) fn bot(&self) -> teloxide::Bot {
        let api_url =
            reqwest::Url::parse(&format!("http://{}/", self.addr)).expect("parse api url");
        teloxide::Bot::new("test-token").set_api_url(api_url)
    }

    /// Request bodies received for `method`, oldest first.
    pub(crate) fn calls(&self, method: &str) -> Vec<Value> {
        self.state
            .calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle(
    State(state): State<MockState>,
    uri: Uri,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let method = uri
        .path()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state
        .calls
        .lock()
        .expect("calls lock")
        .push((method.clone(), body.clone()));
    let reply = (state.responder)(&method, &body);
    (reply.status, Json(reply.body))
}

/// Decode an update the way the HTTP path does. teloxide's `Update` only
/// recognizes its kind when read from text, not from a `Value`.
pub(crate) fn parse_update(value: Value) -> teloxide::types::Update {
    serde_json::from_str(&value.to_string()).expect("decode update")
}

/// A `message` update carrying text from a private chat.
pub(crate) fn text_update(
    update_id: u32,
    chat_id: i64,
    username: Option<&str>,
    first_name: Option<&str>,
    text: &str,
) -> Value {
    let mut chat = json!({ "id": chat_id, "type": "private" });
    if let Some(username) = username {
        chat["username"] = json!(username);
    }
    if let Some(first_name) = first_name {
        chat["first_name"] = json!(first_name);
    }
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "date": 1,
            "chat": chat,
            "text": text,
        },
    })
}

/// The `Message` object Telegram returns from `sendMessage`.
pub(crate) fn sent_message(chat_id: i64, text: &str) -> Value {
    json!({
        "message_id": 1,
        "date": 0,
        "chat": { "id": chat_id, "type": "private" },
        "text": text,
    })
}
