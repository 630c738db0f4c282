//! Mock Mistral API server for integration tests
//!
//! Serves canned chat, embedding, model and transcription responses and
//! records what the client sent so tests can assert on it.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Scripted failure for the chat endpoint
#[derive(Debug, Clone)]
pub struct ScriptedFailure {
    pub status: StatusCode,
    pub body: String,
    pub retry_after: Option<String>,
    /// Requests to fail before succeeding
    pub times: u32,
}

impl ScriptedFailure {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
            times: u32::MAX,
        }
    }

    pub fn retry_after(mut self, value: &str) -> Self {
        self.retry_after = Some(value.to_owned());
        self
    }

    pub fn times(mut self, times: u32) -> Self {
        self.times = times;
        self
    }
}

/// How the mock should answer
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    pub chat_failure: Option<ScriptedFailure>,
    /// Raw event-stream body for streaming chat requests
    pub stream_body: Option<String>,
    /// Send the first stream chunk then stall forever
    pub stall_stream: bool,
    /// Stream `t0`..`t7` deltas with this pause before each one
    pub drip_interval: Option<Duration>,
}

/// Mock vendor backend
pub struct MockMistral {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    behavior: MockBehavior,
    failures_left: AtomicU32,
    chat_count: AtomicU32,
    embedding_count: AtomicU32,
    transcription_count: AtomicU32,
    last_authorization: Mutex<Option<String>>,
    last_user_agent: Mutex<Option<String>>,
    last_chat_body: Mutex<Option<Value>>,
    transcription_fields: Mutex<Vec<String>>,
}

impl MockMistral {
    /// Start a mock that always succeeds
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(MockBehavior::default()).await
    }

    pub async fn start_with(behavior: MockBehavior) -> anyhow::Result<Self> {
        let failures_left = behavior.chat_failure.as_ref().map_or(0, |f| f.times);
        let state = Arc::new(MockState {
            behavior,
            failures_left: AtomicU32::new(failures_left),
            chat_count: AtomicU32::new(0),
            embedding_count: AtomicU32::new(0),
            transcription_count: AtomicU32::new(0),
            last_authorization: Mutex::new(None),
            last_user_agent: Mutex::new(None),
            last_chat_body: Mutex::new(None),
            transcription_fields: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat))
            .route("/v1/embeddings", routing::post(handle_embeddings))
            .route("/v1/models", routing::get(handle_list_models))
            .route(
                "/v1/models/{id}",
                routing::get(handle_retrieve_model).delete(handle_delete_model),
            )
            .route("/v1/audio/transcriptions", routing::post(handle_transcription))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn chat_count(&self) -> u32 {
        self.state.chat_count.load(Ordering::Relaxed)
    }

    pub fn embedding_count(&self) -> u32 {
        self.state.embedding_count.load(Ordering::Relaxed)
    }

    pub fn transcription_count(&self) -> u32 {
        self.state.transcription_count.load(Ordering::Relaxed)
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().unwrap().clone()
    }

    pub fn last_user_agent(&self) -> Option<String> {
        self.state.last_user_agent.lock().unwrap().clone()
    }

    pub fn last_chat_body(&self) -> Option<Value> {
        self.state.last_chat_body.lock().unwrap().clone()
    }

    /// Multipart fields of the last transcription request as `name=value`
    pub fn transcription_fields(&self) -> Vec<String> {
        self.state.transcription_fields.lock().unwrap().clone()
    }
}

impl Drop for MockMistral {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn record_headers(state: &MockState, headers: &HeaderMap) {
    let get = |name| headers.get(name).and_then(|v: &HeaderValue| v.to_str().ok()).map(ToOwned::to_owned);
    *state.last_authorization.lock().unwrap() = get(header::AUTHORIZATION);
    *state.last_user_agent.lock().unwrap() = get(header::USER_AGENT);
}

fn event_stream(body: impl Into<Body>) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/event-stream")], body.into()).into_response()
}

fn data_line(value: &Value) -> String {
    format!("data: {value}\n\n")
}

// -- Chat --

async fn handle_chat(State(state): State<Arc<MockState>>, headers: HeaderMap, Json(req): Json<Value>) -> Response {
    state.chat_count.fetch_add(1, Ordering::Relaxed);
    record_headers(&state, &headers);
    *state.last_chat_body.lock().unwrap() = Some(req.clone());

    if let Some(failure) = &state.behavior.chat_failure {
        let remaining = state.failures_left.load(Ordering::Relaxed);
        if remaining > 0 {
            state.failures_left.store(remaining - 1, Ordering::Relaxed);
            let mut response = (failure.status, failure.body.clone()).into_response();
            if let Some(retry_after) = &failure.retry_after {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from_str(retry_after).unwrap());
            }
            return response;
        }
    }

    let model = req["model"].as_str().unwrap_or("mistral-small-latest").to_owned();

    if req["stream"].as_bool().unwrap_or(false) {
        return chat_stream(&state.behavior, &model);
    }

    Json(json!({
        "id": "cmpl-mock-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Hello from mock Mistral", "tool_calls": null},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
    }))
    .into_response()
}

fn chat_stream(behavior: &MockBehavior, model: &str) -> Response {
    if let Some(body) = &behavior.stream_body {
        return event_stream(body.clone());
    }

    let chunk = |delta: Value, finish: Value| {
        json!({
            "id": "cmpl-mock-stream",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": model,
            "choices": [{"index": 0, "delta": delta, "finish_reason": finish}]
        })
    };

    let first = data_line(&chunk(json!({"role": "assistant", "content": ""}), Value::Null));

    if behavior.stall_stream {
        let chunks = stream::iter(vec![Ok::<_, Infallible>(Bytes::from(first))]).chain(stream::pending());
        return event_stream(Body::from_stream(chunks));
    }

    if let Some(interval) = behavior.drip_interval {
        let mut lines = vec![first];
        lines.extend((0..8).map(|i| data_line(&chunk(json!({"content": format!("t{i}")}), Value::Null))));
        lines.push(data_line(&chunk(json!({"content": ""}), json!("stop"))));
        lines.push("data: [DONE]\n\n".to_owned());

        let chunks = stream::iter(lines).then(move |line| async move {
            tokio::time::sleep(interval).await;
            Ok::<_, Infallible>(Bytes::from(line))
        });
        return event_stream(Body::from_stream(chunks));
    }

    let mut last = chunk(json!({"content": ""}), json!("stop"));
    last["usage"] = json!({"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12});

    let body = [
        first,
        data_line(&chunk(json!({"content": "Hello"}), Value::Null)),
        data_line(&chunk(json!({"content": " world"}), Value::Null)),
        data_line(&last),
        "data: [DONE]\n\n".to_owned(),
    ]
    .concat();

    event_stream(body)
}

// -- Embeddings --

async fn handle_embeddings(State(state): State<Arc<MockState>>, Json(req): Json<Value>) -> Json<Value> {
    state.embedding_count.fetch_add(1, Ordering::Relaxed);

    let inputs = match &req["input"] {
        Value::Array(items) => items.len(),
        _ => 1,
    };
    let data: Vec<Value> = (0..inputs)
        .map(|index| json!({"object": "embedding", "embedding": [0.1, 0.2, 0.3], "index": index}))
        .collect();

    Json(json!({
        "id": "embd-mock-1",
        "object": "list",
        "model": req["model"],
        "data": data,
        "usage": {"prompt_tokens": 6, "total_tokens": 6}
    }))
}

// -- Models --

fn model_card(id: &str) -> Value {
    json!({
        "id": id,
        "object": "model",
        "created": 1_700_000_000,
        "owned_by": "mistralai",
        "max_context_length": 32768,
        "aliases": [],
        "capabilities": {"completion_chat": true}
    })
}

async fn handle_list_models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [model_card("mistral-small-latest"), model_card("mistral-embed")]
    }))
}

fn model_not_found(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "object": "error",
            "message": format!("Model not found: {id}"),
            "type": "invalid_request_error",
            "code": "1500"
        })),
    )
        .into_response()
}

async fn handle_retrieve_model(Path(id): Path<String>) -> Response {
    if id == "missing" {
        return model_not_found(&id);
    }
    Json(model_card(&id)).into_response()
}

async fn handle_delete_model(Path(id): Path<String>) -> Response {
    if id == "missing" {
        return model_not_found(&id);
    }
    Json(json!({"id": id, "object": "model", "deleted": true})).into_response()
}

// -- Audio --

async fn handle_transcription(State(state): State<Arc<MockState>>, mut multipart: Multipart) -> Response {
    state.transcription_count.fetch_add(1, Ordering::Relaxed);

    let mut fields = Vec::new();
    let mut stream = false;

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_owned();
        match field.file_name().map(ToOwned::to_owned) {
            Some(file_name) => {
                let data = field.bytes().await.unwrap();
                fields.push(format!("{name}={file_name}:{}", data.len()));
            }
            None => {
                let value = field.text().await.unwrap();
                if name == "stream" {
                    stream = value == "true";
                }
                fields.push(format!("{name}={value}"));
            }
        }
    }

    *state.transcription_fields.lock().unwrap() = fields;

    if stream {
        let body = [
            data_line(&json!({"type": "transcription.language", "audio_language": "en"})),
            data_line(&json!({"type": "transcription.text.delta", "text": "Hello "})),
            data_line(&json!({"type": "transcription.segment", "text": "Hello world", "start": 0.0, "end": 1.1})),
            data_line(&json!({"type": "transcription.text.delta", "text": "world"})),
            data_line(&json!({
                "type": "transcription.done",
                "model": "voxtral-mini-latest",
                "text": "Hello world",
                "language": "en",
                "usage": {"prompt_tokens": 4, "completion_tokens": 2, "total_tokens": 6, "prompt_audio_seconds": 1}
            })),
        ]
        .concat();
        return event_stream(body);
    }

    Json(json!({
        "model": "voxtral-mini-latest",
        "text": "Hello world",
        "language": "en",
        "segments": [{"text": "Hello world", "start": 0.0, "end": 1.1}],
        "usage": {"prompt_tokens": 4, "completion_tokens": 2, "total_tokens": 6, "prompt_audio_seconds": 1}
    }))
    .into_response()
}
