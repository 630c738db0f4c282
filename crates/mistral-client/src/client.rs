use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use mistral_cache::{ResponseCache, cache_key, is_cacheable};
use mistral_config::ClientConfig;
use mistral_core::{
    ApiFailure, ChatCompletionRequest, ChatCompletionResponse, DeletedModel, EmbeddingRequest, EmbeddingResponse,
    ErrorKind, EventStream, InterpretedResponse, ModelCard, ModelList, TranscriptionRequest, TranscriptionResponse,
    TransportError, Validate, ValidationResult, decode_chat, decode_transcription, interpret_with_retry_after, validate,
};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::de::{DeserializeOwned, IgnoredAny};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{ClientError, Result};
use crate::transport::{retry_after, transport_error, transport_failure};

/// Response body as decoder input
type ByteStream = BoxStream<'static, std::result::Result<Bytes, TransportError>>;

const DEFAULT_USER_AGENT: &str = concat!("mistral-client-rust/", env!("CARGO_PKG_VERSION"));

/// Typed client for the Mistral REST API
#[derive(Clone)]
pub struct MistralClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    raise_on_error: bool,
    validate_requests: bool,
    cache: ResponseCache<ChatCompletionResponse>,
}

impl fmt::Debug for MistralClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MistralClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("raise_on_error", &self.raise_on_error)
            .field("validate_requests", &self.validate_requests)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl MistralClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the key or user
    /// agent cannot be sent as a header
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate().map_err(|e| ClientError::Config(e.to_string()))?;
        let timeout = config
            .request_timeout()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
            .map_err(|_| ClientError::Config("api_key contains invalid header characters".to_owned()))?;
        auth.set_sensitive(true);

        let user_agent = HeaderValue::from_str(config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
            .map_err(|e| ClientError::Config(format!("invalid user_agent: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(USER_AGENT, user_agent);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.server_url.clone(),
            timeout,
            raise_on_error: config.raise_on_error,
            validate_requests: config.validate_requests,
            cache: ResponseCache::new(&config.cache),
        })
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Drop every cached response
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    // -- Chat --

    /// Send a chat completion request (non-streaming)
    ///
    /// Served from the response cache when enabled and a prior identical
    /// request succeeded.
    pub async fn chat(&self, request: &ChatCompletionRequest) -> Result<InterpretedResponse<ChatCompletionResponse>> {
        if let Some(rejected) = self.reject_invalid(request)? {
            return Ok(rejected);
        }

        let request = ChatCompletionRequest {
            stream: false,
            ..request.clone()
        };

        let key = if self.cache.is_enabled() && is_cacheable(&request) {
            Some(cache_key(&request).map_err(|e| ClientError::Request(e.to_string()))?)
        } else {
            None
        };

        if let Some(key) = &key
            && let Some(payload) = self.cache.get(key)
        {
            return Ok(InterpretedResponse::Success { payload, status: 200 });
        }

        let url = self.endpoint("/v1/chat/completions");
        let outcome: InterpretedResponse<ChatCompletionResponse> =
            execute(self.http.post(url).json(&request), self.timeout).await;

        if let (Some(key), InterpretedResponse::Success { payload, .. }) = (&key, &outcome) {
            self.cache.put(key, payload.clone());
        }

        self.finish(outcome)
    }

    /// Send a streaming chat completion request
    ///
    /// The returned stream ends after `[DONE]`, at end of input, or with a
    /// single error on transport failure or cancellation.
    pub async fn chat_stream(
        &self,
        request: &ChatCompletionRequest,
        cancel: CancellationToken,
    ) -> Result<InterpretedResponse<EventStream>> {
        if let Some(rejected) = self.reject_invalid(request)? {
            return Ok(rejected);
        }

        let request = ChatCompletionRequest {
            stream: true,
            ..request.clone()
        };

        let url = self.endpoint("/v1/chat/completions");
        let outcome = open_stream(self.http.post(url).json(&request), cancel, decode_chat).await;

        self.finish(outcome)
    }

    // -- Embeddings --

    /// Generate embeddings for text input
    pub async fn embeddings(&self, request: &EmbeddingRequest) -> Result<InterpretedResponse<EmbeddingResponse>> {
        if let Some(rejected) = self.reject_invalid(request)? {
            return Ok(rejected);
        }

        let url = self.endpoint("/v1/embeddings");
        let outcome = execute(self.http.post(url).json(request), self.timeout).await;
        self.finish(outcome)
    }

    // -- Models --

    /// List available models
    pub async fn list_models(&self) -> Result<InterpretedResponse<ModelList>> {
        let url = self.endpoint("/v1/models");
        let outcome = execute(self.http.get(url), self.timeout).await;
        self.finish(outcome)
    }

    /// Retrieve a single model
    pub async fn retrieve_model(&self, model_id: &str) -> Result<InterpretedResponse<ModelCard>> {
        let url = self.model_url(model_id)?;
        let outcome = execute(self.http.get(url), self.timeout).await;
        self.finish(outcome)
    }

    /// Delete a fine-tuned model
    pub async fn delete_model(&self, model_id: &str) -> Result<InterpretedResponse<DeletedModel>> {
        let url = self.model_url(model_id)?;
        let outcome = execute(self.http.delete(url), self.timeout).await;
        self.finish(outcome)
    }

    // -- Audio --

    /// Transcribe audio
    pub async fn transcribe(&self, request: &TranscriptionRequest) -> Result<InterpretedResponse<TranscriptionResponse>> {
        if let Some(rejected) = self.reject_invalid(request)? {
            return Ok(rejected);
        }

        let url = self.endpoint("/v1/audio/transcriptions");
        let form = transcription_form(request, false);
        let outcome = execute(self.http.post(url).multipart(form), self.timeout).await;
        self.finish(outcome)
    }

    /// Transcribe audio as an event stream
    pub async fn transcribe_stream(
        &self,
        request: &TranscriptionRequest,
        cancel: CancellationToken,
    ) -> Result<InterpretedResponse<EventStream>> {
        if let Some(rejected) = self.reject_invalid(request)? {
            return Ok(rejected);
        }

        let url = self.endpoint("/v1/audio/transcriptions");
        let form = transcription_form(request, true);
        let outcome = open_stream(self.http.post(url).multipart(form), cancel, decode_transcription).await;

        self.finish(outcome)
    }

    // -- Helpers --

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url
    }

    fn model_url(&self, model_id: &str) -> Result<Url> {
        if model_id.trim().is_empty() {
            return Err(ClientError::Request("model id must not be empty".to_owned()));
        }

        let mut url = self.endpoint("/v1/models");
        url.path_segments_mut()
            .map_err(|()| ClientError::Config("server_url cannot be a base URL".to_owned()))?
            .push(model_id);
        Ok(url)
    }

    /// Validation outcome as a ready response, or `None` to proceed
    fn reject_invalid<R, T>(&self, request: &R) -> Result<Option<InterpretedResponse<T>>>
    where
        R: Validate + ?Sized,
    {
        if !self.validate_requests {
            return Ok(None);
        }

        match validate(request) {
            ValidationResult::Valid => Ok(None),
            ValidationResult::Invalid(violations) => {
                tracing::debug!(violations = violations.len(), "request rejected by validation");
                if self.raise_on_error {
                    Err(ClientError::InvalidRequest(violations))
                } else {
                    Ok(Some(InterpretedResponse::Failure(ApiFailure::new(
                        ErrorKind::Validation,
                        violations.join("; "),
                    ))))
                }
            }
        }
    }

    /// Apply the raise-or-return policy
    fn finish<T>(&self, outcome: InterpretedResponse<T>) -> Result<InterpretedResponse<T>> {
        match outcome {
            InterpretedResponse::Failure(failure) => {
                tracing::warn!(
                    kind = %failure.kind,
                    status = failure.status,
                    retryable = failure.is_retryable(),
                    "request failed"
                );
                if self.raise_on_error {
                    Err(ClientError::Api(failure))
                } else {
                    Ok(InterpretedResponse::Failure(failure))
                }
            }
            success => Ok(success),
        }
    }
}

/// Send a request and interpret the full body
///
/// `timeout` bounds the whole exchange. Streams are only bounded per read.
async fn execute<T: DeserializeOwned>(builder: reqwest::RequestBuilder, timeout: Duration) -> InterpretedResponse<T> {
    let response = match builder.timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => return InterpretedResponse::Failure(transport_failure(&e)),
    };

    let status = response.status().as_u16();
    let delay = retry_after(response.headers());

    match response.bytes().await {
        Ok(body) => interpret_with_retry_after(status, &body, delay),
        Err(e) => InterpretedResponse::Failure(transport_failure(&e)),
    }
}

/// Send a request and decode a successful body as an event stream
async fn open_stream(
    builder: reqwest::RequestBuilder,
    cancel: CancellationToken,
    decode: fn(ByteStream, CancellationToken) -> EventStream,
) -> InterpretedResponse<EventStream> {
    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => return InterpretedResponse::Failure(transport_failure(&e)),
    };

    let status = response.status();
    if status.is_success() {
        let bytes = response.bytes_stream().map(|chunk| chunk.map_err(|e| transport_error(&e))).boxed();
        return InterpretedResponse::Success {
            payload: decode(bytes, cancel),
            status: status.as_u16(),
        };
    }

    let status = status.as_u16();
    let delay = retry_after(response.headers());
    let failure = match response.bytes().await {
        Ok(body) => match interpret_with_retry_after::<IgnoredAny>(status, &body, delay) {
            InterpretedResponse::Failure(failure) => failure,
            InterpretedResponse::Success { .. } => {
                ApiFailure::from_status(status, format!("unexpected status {status} for event stream"))
            }
        },
        Err(e) => transport_failure(&e),
    };

    InterpretedResponse::Failure(failure)
}

/// Multipart body for a transcription request
fn transcription_form(request: &TranscriptionRequest, stream: bool) -> Form {
    let mut form = Form::new().text("model", request.model.clone());

    if let Some(file) = &request.file {
        let part = Part::bytes(file.data.to_vec()).file_name(file.file_name.clone());
        form = form.part("file", part);
    }
    if let Some(file_url) = &request.file_url {
        form = form.text("file_url", file_url.clone());
    }
    if let Some(file_id) = &request.file_id {
        form = form.text("file_id", file_id.clone());
    }
    if let Some(language) = &request.language {
        form = form.text("language", language.clone());
    }
    if let Some(temperature) = request.temperature {
        form = form.text("temperature", temperature.to_string());
    }
    for granularity in &request.timestamp_granularities {
        form = form.text("timestamp_granularities", granularity.clone());
    }

    form.text("stream", stream.to_string())
}
