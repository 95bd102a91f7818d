//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI and any endpoint exposing `/v1/chat/completions` and
//! `/v1/audio/transcriptions`.
//!
//! Supports:
//! - Chat completions (non-streaming and streaming SSE)
//! - Tool use / function calling
//! - JSON response format
//! - Multi-part (text + image) messages
//! - Audio/video transcription

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use llmask_core::error::{MediaError, ProviderError};
use llmask_core::media::Transcriber;
use llmask_core::message::{ContentPart, Message, MessageToolCall, Role};
use llmask_core::provider::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tokio::sync::mpsc::Sender;
use tracing::{debug, trace, warn};

use crate::transcription;

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    transcription_model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            transcription_model: "whisper-1".into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Use a different speech-to-text model.
    pub fn with_transcription_model(mut self, model: impl Into<String>) -> Self {
        self.transcription_model = model.into();
        self
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| {
                let content = if !m.parts.is_empty() {
                    Some(ApiContent::Parts(
                        m.parts
                            .iter()
                            .map(|p| match p {
                                ContentPart::Text { text } => {
                                    ApiContentPart::Text { text: text.clone() }
                                }
                                ContentPart::ImageUrl { url } => ApiContentPart::ImageUrl {
                                    image_url: ApiImageUrl { url: url.clone() },
                                },
                            })
                            .collect(),
                    ))
                } else if m.content.is_empty() && !m.tool_calls.is_empty() {
                    None
                } else {
                    Some(ApiContent::Text(m.content.clone()))
                };

                ApiMessage {
                    role: match m.role {
                        Role::User => "user".into(),
                        Role::Assistant => "assistant".into(),
                        Role::System => "system".into(),
                        Role::Tool => "tool".into(),
                    },
                    content,
                    tool_calls: if m.tool_calls.is_empty() {
                        None
                    } else {
                        Some(
                            m.tool_calls
                                .iter()
                                .map(|tc| ApiToolCall {
                                    id: tc.id.clone(),
                                    r#type: "function".into(),
                                    function: ApiFunction {
                                        name: tc.name.clone(),
                                        arguments: tc.arguments.clone(),
                                    },
                                })
                                .collect(),
                        )
                    },
                    tool_call_id: m.tool_call_id.clone(),
                }
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Build the JSON body shared by streaming and non-streaming requests.
    fn request_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "top_p": 1,
            "stream": stream,
        });

        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        match request.response_format {
            ResponseFormat::Unspecified => {}
            ResponseFormat::Json => {
                body["response_format"] = serde_json::json!({ "type": "json_object" });
            }
            ResponseFormat::Text => {
                body["response_format"] = serde_json::json!({ "type": "text" });
            }
        }

        body
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        accept_sse: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let mut builder = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if accept_sse {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(provider = %self.name, status, body = %error_body, "Provider returned error");
            return Err(classify_error(status, &error_body));
        }
        Ok(response)
    }
}

static TOKEN_COUNT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(\d+) tokens").ok());

/// Map a non-200 response to a provider error.
///
/// Size and rate limits carry the token count when the message reports one.
fn classify_error(status: u16, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string());

    if status == 401 || status == 403 {
        return ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        );
    }

    let tokens = TOKEN_COUNT
        .as_ref()
        .and_then(|re| re.captures(&message))
        .and_then(|caps| caps[1].parse::<u64>().ok());
    if tokens.is_some() {
        return ProviderError::LimitExceeded { tokens, message };
    }

    if status == 429 {
        return ProviderError::RateLimited {
            retry_after_secs: 5,
        };
    }

    ProviderError::ApiError {
        status_code: status,
        message,
    }
}

#[async_trait]
impl llmask_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request, false);

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self.post_json(&url, &body, false).await?;

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::ApiError {
                    status_code: 200,
                    message: "No choices in response".into(),
                })?;

        let tool_calls: Vec<MessageToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| MessageToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let content = match choice.message.content {
            Some(ApiContent::Text(text)) => text,
            Some(ApiContent::Parts(parts)) => parts
                .into_iter()
                .filter_map(|p| match p {
                    ApiContentPart::Text { text } => Some(text),
                    ApiContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
            None => String::new(),
        };

        let mut message = Message::assistant(content);
        message.tool_calls = tool_calls;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message,
            finish_reason: FinishReason::from_api(choice.finish_reason.as_deref().unwrap_or("")),
            usage,
            model: api_response.model,
        })
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request, true);

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self.post_json(&url, &body, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        tokio::spawn(async move {
            pump_sse(response.bytes_stream(), tx, &provider_name).await;
        });

        Ok(rx)
    }
}

#[async_trait]
impl Transcriber for OpenAiCompatProvider {
    async fn transcribe(&self, media: &[u8], content_type: &str) -> Result<String, MediaError> {
        let url = format!("{}/audio/transcriptions", self.base_url);
        let filename = transcription::synthetic_filename(content_type)?;

        let part = reqwest::multipart::Part::bytes(media.to_vec())
            .file_name(filename.clone())
            .mime_str(content_type)
            .map_err(|e| MediaError::TranscriptionFailed(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.transcription_model.clone())
            .text("temperature", "1");

        debug!(
            provider = %self.name,
            file = %filename,
            bytes = media.len(),
            "Sending transcription request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::TranscriptionFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(MediaError::TranscriptionFailed(
                classify_error(status, &error_body).to_string(),
            ));
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| {
                MediaError::TranscriptionFailed(format!("Failed to parse response: {e}"))
            })?;
        Ok(body.text)
    }
}

/// What one SSE line means for the stream.
enum SseLine {
    Skip,
    Chunk(StreamChunk),
    Done,
    Failed(ProviderError),
}

fn parse_sse_line(line: &str, state: &mut StreamState, provider_name: &str) -> SseLine {
    // Blank lines separate events; ':' starts a comment.
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();

    if data == "[DONE]" {
        return SseLine::Done;
    }

    // Error events arrive as data lines too.
    if serde_json::from_str::<ApiErrorBody>(data).is_ok() {
        return SseLine::Failed(classify_error(200, data));
    }

    match serde_json::from_str::<StreamResponse>(data) {
        Ok(resp) => state.apply(resp).map_or(SseLine::Skip, SseLine::Chunk),
        Err(e) => {
            trace!(
                provider = %provider_name,
                data = %data,
                error = %e,
                "Ignoring unparseable SSE chunk"
            );
            SseLine::Skip
        }
    }
}

/// Read an SSE body and forward parsed chunks to `tx`.
///
/// Bytes are buffered until a full line is available, so a UTF-8 character
/// split across network reads is decoded intact. The terminal chunk is sent
/// on `[DONE]` or when the body ends without it.
async fn pump_sse<S, B, E>(
    mut byte_stream: S,
    tx: Sender<Result<StreamChunk, ProviderError>>,
    provider_name: &str,
) where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut buffer: Vec<u8> = Vec::new();
    let mut state = StreamState::default();

    while let Some(chunk_result) = byte_stream.next().await {
        let bytes = match chunk_result {
            Ok(b) => b,
            Err(e) => {
                let _ = tx
                    .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                    .await;
                return;
            }
        };
        buffer.extend_from_slice(bytes.as_ref());

        let mut consumed = 0;
        while let Some(offset) = buffer[consumed..].iter().position(|&b| b == b'\n') {
            let line_end = consumed + offset;
            let parsed = {
                let line = String::from_utf8_lossy(&buffer[consumed..line_end]);
                parse_sse_line(line.trim_end_matches('\r'), &mut state, provider_name)
            };
            consumed = line_end + 1;

            match parsed {
                SseLine::Skip => {}
                SseLine::Chunk(chunk) => {
                    if tx.send(Ok(chunk)).await.is_err() {
                        return; // receiver dropped
                    }
                }
                SseLine::Done => {
                    let _ = tx.send(Ok(state.finish())).await;
                    return;
                }
                SseLine::Failed(err) => {
                    let _ = tx.send(Err(err)).await;
                    return;
                }
            }
        }
        buffer.drain(..consumed);
    }

    // Body ended without [DONE]; send the final chunk anyway
    let _ = tx.send(Ok(state.finish())).await;
}

/// Accumulates streamed deltas between chunks.
#[derive(Default)]
struct StreamState {
    /// Tool call deltas keyed by index; BTreeMap keeps call order.
    tool_calls: BTreeMap<u32, ToolCallAccumulator>,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
}

impl StreamState {
    /// Fold one SSE payload in; returns a chunk to forward when it carries content.
    fn apply(&mut self, resp: StreamResponse) -> Option<StreamChunk> {
        if let Some(usage) = resp.usage {
            self.usage = Some(Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            });
        }

        let choice = resp.choices.into_iter().next()?;

        if let Some(tc_deltas) = choice.delta.tool_calls {
            for tc_delta in tc_deltas {
                let acc = self.tool_calls.entry(tc_delta.index).or_default();
                if let Some(id) = tc_delta.id {
                    acc.id = id;
                }
                if let Some(func) = tc_delta.function {
                    if let Some(name) = func.name.filter(|n| !n.is_empty()) {
                        acc.name = name;
                    }
                    if let Some(args) = func.arguments {
                        acc.arguments.push_str(&args);
                    }
                }
            }
        }

        if let Some(reason) = choice.finish_reason.filter(|r| !r.is_empty()) {
            self.finish_reason = Some(FinishReason::from_api(&reason));
        }

        let content = choice.delta.content.filter(|c| !c.is_empty())?;
        Some(StreamChunk {
            content: Some(content),
            tool_calls: Vec::new(),
            finish_reason: None,
            done: false,
            usage: None,
        })
    }

    /// The terminal chunk: completed tool calls, finish reason and usage.
    fn finish(&mut self) -> StreamChunk {
        StreamChunk {
            content: None,
            tool_calls: std::mem::take(&mut self.tool_calls)
                .into_values()
                .map(ToolCallAccumulator::into_tool_call)
                .collect(),
            finish_reason: self.finish_reason.take(),
            done: true,
            usage: self.usage.take(),
        }
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<ApiContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Parts(Vec<ApiContentPart>),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentPart {
    Text { text: String },
    ImageUrl { image_url: ApiImageUrl },
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiImageUrl {
    url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A tool call delta; arrives incrementally across chunks.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Accumulates incremental tool call deltas into a complete tool call.
#[derive(Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    fn into_tool_call(self) -> MessageToolCall {
        MessageToolCall {
            id: self.id,
            name: self.name,
            arguments: self.arguments,
        }
    }
}
