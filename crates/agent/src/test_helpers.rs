//! Shared test helpers: scripted backends and tools.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use llmask_core::error::{MediaError, ProviderError, ToolError};
use llmask_core::media::{TextExtractor, Transcriber};
use llmask_core::message::{Message, MessageToolCall};
use llmask_core::provider::{
    FinishReason, Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage,
};
use llmask_core::tool::Tool;

/// A provider that replays scripted responses and records every request.
///
/// Running out of responses is reported as an API error.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 500,
                message: "script exhausted".into(),
            })
    }
}

fn response(message: Message, finish_reason: FinishReason) -> ProviderResponse {
    ProviderResponse {
        message,
        finish_reason,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A `stop` response carrying `text`.
pub fn make_text_response(text: &str) -> ProviderResponse {
    response(Message::assistant(text), FinishReason::Stop)
}

/// A `tool_calls` response.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    let mut msg = Message::assistant("");
    msg.tool_calls = tool_calls;
    response(msg, FinishReason::ToolCalls)
}

/// A response with an arbitrary finish reason.
pub fn make_finish_response(reason: &str) -> ProviderResponse {
    response(Message::assistant("truncated"), FinishReason::from_api(reason))
}

pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.into(),
        name: name.into(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// Transcriber returning fixed text.
pub struct StaticTranscriber(String);

impl StaticTranscriber {
    pub fn new(text: &str) -> Self {
        Self(text.into())
    }
}

#[async_trait]
impl Transcriber for StaticTranscriber {
    async fn transcribe(&self, _media: &[u8], _content_type: &str) -> Result<String, MediaError> {
        Ok(self.0.clone())
    }
}

/// Extractor returning fixed text.
pub struct StaticExtractor(String);

impl StaticExtractor {
    pub fn new(text: &str) -> Self {
        Self(text.into())
    }
}

#[async_trait]
impl TextExtractor for StaticExtractor {
    async fn extract_text(&self, _pdf: &[u8]) -> Result<String, MediaError> {
        Ok(self.0.clone())
    }
}

/// Extractor that always fails like a crashed process.
pub struct FailingExtractor;

#[async_trait]
impl TextExtractor for FailingExtractor {
    async fn extract_text(&self, _pdf: &[u8]) -> Result<String, MediaError> {
        Err(MediaError::ExtractionFailed {
            status: "exit status: 1".into(),
            stderr: "Syntax Error: Couldn't find trailer dictionary".into(),
        })
    }
}

/// A tool that echoes its arguments, registered under `defined`.
pub struct EchoTool {
    pub defined: String,
}

impl EchoTool {
    pub fn named(name: &str) -> Self {
        Self { defined: name.into() }
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.defined.clone(),
            description: "echoes its arguments".into(),
            parameters: serde_json::json!({"type": "object"}),
        }
    }

    async fn compute(&self, arguments: &str) -> Result<String, ToolError> {
        Ok(format!("{}:{arguments}", self.defined))
    }
}

/// A tool whose computation always fails.
pub struct BrokenTool;

#[async_trait]
impl Tool for BrokenTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "broken".into(),
            description: "always fails".into(),
            parameters: serde_json::json!({"type": "object"}),
        }
    }

    async fn compute(&self, _arguments: &str) -> Result<String, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "broken".into(),
            reason: "division by zero".into(),
        })
    }
}
