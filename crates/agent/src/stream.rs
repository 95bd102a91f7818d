//! Streaming fan-out: deltas reach the caller's sink and the stored
//! message through the same write.

use std::io::Write;

use llmask_core::error::{Error, ProviderError};
use llmask_core::message::MessageToolCall;
use llmask_core::provider::{FinishReason, ProviderResponse, StreamChunk, Usage};
use tokio::sync::mpsc::Receiver;
use tracing::trace;

/// One finished completion turn, however it was delivered.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub tool_calls: Vec<MessageToolCall>,
    pub finish_reason: FinishReason,
    pub usage: Option<Usage>,
}

impl From<ProviderResponse> for Completion {
    fn from(response: ProviderResponse) -> Self {
        Self {
            content: response.message.content,
            tool_calls: response.message.tool_calls,
            finish_reason: response.finish_reason,
            usage: response.usage,
        }
    }
}

/// Writes every delta to a sink and to an accumulation buffer.
pub struct FanOut<'a> {
    sink: &'a mut (dyn Write + Send),
    buffer: String,
}

impl<'a> FanOut<'a> {
    pub fn new(sink: &'a mut (dyn Write + Send)) -> Self {
        Self {
            sink,
            buffer: String::new(),
        }
    }

    pub fn write(&mut self, delta: &str) -> std::io::Result<()> {
        self.sink.write_all(delta.as_bytes())?;
        self.sink.flush()?;
        self.buffer.push_str(delta);
        Ok(())
    }

    /// End the turn with a newline and hand back everything written.
    pub fn finish(mut self) -> std::io::Result<String> {
        self.write("\n")?;
        Ok(self.buffer)
    }
}

/// Drain a provider stream through a [`FanOut`] into a [`Completion`].
///
/// A stream that ends without reporting a finish reason is treated as
/// interrupted.
pub async fn collect(
    mut rx: Receiver<Result<StreamChunk, ProviderError>>,
    sink: &mut (dyn Write + Send),
) -> Result<Completion, Error> {
    let mut out = FanOut::new(sink);
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;
    let mut usage = None;

    while let Some(chunk) = rx.recv().await {
        let chunk = chunk?;
        if let Some(delta) = chunk.content.as_deref().filter(|d| !d.is_empty()) {
            out.write(delta)?;
        }
        tool_calls.extend(chunk.tool_calls);
        if chunk.finish_reason.is_some() {
            finish_reason = chunk.finish_reason;
        }
        if chunk.usage.is_some() {
            usage = chunk.usage;
        }
        if chunk.done {
            break;
        }
    }

    let finish_reason = finish_reason.ok_or_else(|| {
        ProviderError::StreamInterrupted("stream ended without a finish reason".into())
    })?;
    let content = out.finish()?;
    trace!(bytes = content.len(), tool_calls = tool_calls.len(), "Stream collected");

    Ok(Completion {
        content,
        tool_calls,
        finish_reason,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(text: &str) -> Result<StreamChunk, ProviderError> {
        Ok(StreamChunk {
            content: Some(text.into()),
            tool_calls: vec![],
            finish_reason: None,
            done: false,
            usage: None,
        })
    }

    fn last(
        reason: FinishReason,
        tool_calls: Vec<MessageToolCall>,
    ) -> Result<StreamChunk, ProviderError> {
        Ok(StreamChunk {
            content: None,
            tool_calls,
            finish_reason: Some(reason),
            done: true,
            usage: None,
        })
    }

    async fn feed(
        chunks: Vec<Result<StreamChunk, ProviderError>>,
    ) -> Receiver<Result<StreamChunk, ProviderError>> {
        let (tx, rx) = tokio::sync::mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            tx.send(chunk).await.unwrap();
        }
        rx
    }

    #[tokio::test]
    async fn sink_sees_exactly_the_stored_bytes() {
        let rx = feed(vec![
            delta("{\"conversational_"),
            delta("answer\": 1}"),
            last(FinishReason::Stop, vec![]),
        ])
        .await;
        let mut sink = Vec::new();
        let completion = collect(rx, &mut sink).await.unwrap();

        assert_eq!(completion.content, "{\"conversational_answer\": 1}\n");
        assert_eq!(String::from_utf8(sink).unwrap(), completion.content);
        assert_eq!(completion.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn tool_calls_arrive_with_the_final_chunk() {
        let call = MessageToolCall { id: "a".into(), name: "sum".into(), arguments: "{}".into() };
        let rx = feed(vec![last(FinishReason::ToolCalls, vec![call.clone()])]).await;
        let mut sink = Vec::new();
        let completion = collect(rx, &mut sink).await.unwrap();
        assert_eq!(completion.tool_calls, vec![call]);
        assert_eq!(completion.finish_reason, FinishReason::ToolCalls);
    }

    #[tokio::test]
    async fn provider_errors_mid_stream_propagate() {
        let rx = feed(vec![
            delta("par"),
            Err(ProviderError::StreamInterrupted("reset".into())),
        ])
        .await;
        let mut sink = Vec::new();
        let err = collect(rx, &mut sink).await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::StreamInterrupted(_))));
        assert_eq!(sink, b"par");
    }

    #[tokio::test]
    async fn missing_finish_reason_is_an_interruption() {
        let rx = feed(vec![delta("cut off")]).await;
        let mut sink = Vec::new();
        let err = collect(rx, &mut sink).await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::StreamInterrupted(_))));
    }
}
