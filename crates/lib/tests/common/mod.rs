//! Stub upstream servers (Ollama, Graph API Send API, Telegram Bot API) on loopback ports.

#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// A port nothing listens on (bound, then released).
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

/// Serve `app` on an ephemeral loopback port; returns its base URL.
pub async fn spawn_app(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

/// Poll `cond` every 20 ms for up to 5 s.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..250 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}

/// What the stub Ollama answers to POST /api/chat.
#[derive(Clone)]
pub enum OllamaBehavior {
    Reply(String),
    Status(StatusCode),
    Body(String),
    Json(Value),
    Delay(Duration),
}

pub struct OllamaStub {
    pub behavior: OllamaBehavior,
    pub requests: Mutex<Vec<Value>>,
}

impl OllamaStub {
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

async fn ollama_chat(State(stub): State<Arc<OllamaStub>>, Json(body): Json<Value>) -> Response {
    stub.requests.lock().unwrap().push(body);
    match stub.behavior.clone() {
        OllamaBehavior::Reply(text) => Json(json!({
            "model": "llama3",
            "message": { "role": "assistant", "content": text },
            "done": true
        }))
        .into_response(),
        OllamaBehavior::Status(status) => (status, "upstream exploded").into_response(),
        OllamaBehavior::Body(body) => (StatusCode::OK, body).into_response(),
        OllamaBehavior::Json(value) => Json(value).into_response(),
        OllamaBehavior::Delay(d) => {
            tokio::time::sleep(d).await;
            Json(json!({ "message": { "content": "too late" } })).into_response()
        }
    }
}

async fn ollama_tags() -> Json<Value> {
    Json(json!({ "models": [{ "name": "llama3:latest", "size": 1 }] }))
}

pub async fn spawn_ollama(behavior: OllamaBehavior) -> (String, Arc<OllamaStub>) {
    let stub = Arc::new(OllamaStub {
        behavior,
        requests: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/api/chat", post(ollama_chat))
        .route("/api/tags", get(ollama_tags))
        .with_state(stub.clone());
    (spawn_app(app).await, stub)
}

/// Recorded Send API call: query string and JSON body.
pub struct SendApiStub {
    pub status: StatusCode,
    pub calls: Mutex<Vec<(HashMap<String, String>, Value)>>,
}

impl SendApiStub {
    pub fn calls(&self) -> Vec<(HashMap<String, String>, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

async fn send_api(
    State(stub): State<Arc<SendApiStub>>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    stub.calls.lock().unwrap().push((query, body));
    (stub.status, Json(json!({ "recipient_id": "U1", "message_id": "m" }))).into_response()
}

/// Returns the full Send API URL and the stub.
pub async fn spawn_send_api(status: StatusCode) -> (String, Arc<SendApiStub>) {
    let stub = Arc::new(SendApiStub {
        status,
        calls: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/v18.0/me/messages", post(send_api))
        .with_state(stub.clone());
    let base = spawn_app(app).await;
    (format!("{}/v18.0/me/messages", base), stub)
}

/// Telegram Bot API stub: serves `updates` on the first getUpdates call, then empty
/// long polls; records sendMessage bodies and getUpdates offsets.
pub struct TelegramStub {
    pub updates: Mutex<Option<Value>>,
    pub offsets: Mutex<Vec<Option<String>>>,
    pub sent: Mutex<Vec<Value>>,
}

impl TelegramStub {
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }
}

async fn get_updates(
    State(stub): State<Arc<TelegramStub>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    stub.offsets.lock().unwrap().push(query.get("offset").cloned());
    let first = stub.updates.lock().unwrap().take();
    match first {
        Some(updates) => Json(json!({ "ok": true, "result": updates })),
        None => {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Json(json!({ "ok": true, "result": [] }))
        }
    }
}

async fn send_message(State(stub): State<Arc<TelegramStub>>, Json(body): Json<Value>) -> Json<Value> {
    stub.sent.lock().unwrap().push(body);
    Json(json!({ "ok": true, "result": {} }))
}

pub async fn spawn_telegram(updates: Value) -> (String, Arc<TelegramStub>) {
    let stub = Arc::new(TelegramStub {
        updates: Mutex::new(Some(updates)),
        offsets: Mutex::new(Vec::new()),
        sent: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/:bot/getUpdates", get(get_updates))
        .route("/:bot/sendMessage", post(send_message))
        .with_state(stub.clone());
    (spawn_app(app).await, stub)
}
