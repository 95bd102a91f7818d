//! The completion round-trip loop.
//!
//! A question becomes a conversation: preamble, background files, the
//! answer schema, worked examples and finally the prompt. The loop then
//! calls the backend until it either answers with JSON that decodes as
//! `Answer<A>` or fails:
//!
//! - `tool_calls`: each call runs in order and its result is appended; the
//!   loop continues without touching the retry budget.
//! - `stop`: the reply is decoded strictly. A decode failure appends a
//!   corrective message and costs one unit of the retry budget.
//! - anything else ends the run with `UnhandledFinishReason`.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use llmask_config::AppConfig;
use llmask_core::answer::{Answer, Response};
use llmask_core::error::Error;
use llmask_core::media::{TextExtractor, Transcriber};
use llmask_core::message::{Conversation, Message};
use llmask_core::provider::{FinishReason, ModelTier, Provider, ProviderRequest};
use llmask_core::question::Question;
use llmask_core::tool::ToolRegistry;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::retry::RetryBudget;
use crate::router::ContentRouter;
use crate::schema;
use crate::stream::{self, Completion};

/// A run that ended in an error, with the conversation as it stood.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct AskFailure {
    pub error: Error,
    pub messages: Vec<Message>,
}

/// Asks questions of a completion backend and returns typed answers.
pub struct Asker {
    /// Completion backend
    provider: Arc<dyn Provider>,

    /// Background file routing
    router: ContentRouter,

    /// Model for the text tier
    text_model: String,

    /// Model for the vision tier
    vision_model: String,

    /// Sampling temperature
    temperature: f32,

    /// Parse failures tolerated per run
    max_retries: usize,

    /// Tool rounds tolerated per run
    max_tool_rounds: u32,

    /// System messages opening a fresh conversation
    preamble: Vec<String>,
}

impl Asker {
    /// Create an asker with default settings.
    pub fn new(
        provider: Arc<dyn Provider>,
        transcriber: Arc<dyn Transcriber>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let defaults = AppConfig::default();
        Self {
            provider,
            router: ContentRouter::new(transcriber, extractor, defaults.ask.vision_max_tokens),
            text_model: defaults.models.text,
            vision_model: defaults.models.vision,
            temperature: defaults.ask.temperature,
            max_retries: defaults.ask.max_retries,
            max_tool_rounds: defaults.ask.max_tool_rounds,
            preamble: defaults.ask.preamble,
        }
    }

    /// Apply models and loop settings from configuration.
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.text_model = config.models.text.clone();
        self.vision_model = config.models.vision.clone();
        self.temperature = config.ask.temperature;
        self.max_retries = config.ask.max_retries;
        self.max_tool_rounds = config.ask.max_tool_rounds;
        self.preamble = config.ask.preamble.clone();
        self.router = self.router.with_vision_max_tokens(config.ask.vision_max_tokens);
        self
    }

    /// Set the number of answer parse failures that end a run.
    pub fn with_max_retries(mut self, max: usize) -> Self {
        self.max_retries = max;
        self
    }

    /// Set the maximum number of tool rounds per run.
    pub fn with_max_tool_rounds(mut self, max: u32) -> Self {
        self.max_tool_rounds = max;
        self
    }

    /// Replace the system messages that open a fresh conversation.
    pub fn with_preamble(mut self, preamble: Vec<String>) -> Self {
        self.preamble = preamble;
        self
    }

    /// Ask a question without streaming.
    pub async fn ask<A>(&self, question: Question<A>) -> Result<Response<A>, AskFailure>
    where
        A: Serialize + DeserializeOwned + JsonSchema + Clone,
    {
        self.run(question, None).await
    }

    /// Ask a question, writing the model's text to `sink` as it arrives.
    pub async fn ask_streaming<A>(
        &self,
        question: Question<A>,
        sink: &mut (dyn Write + Send),
    ) -> Result<Response<A>, AskFailure>
    where
        A: Serialize + DeserializeOwned + JsonSchema + Clone,
    {
        self.run(question, Some(sink)).await
    }

    async fn run<A>(
        &self,
        mut question: Question<A>,
        sink: Option<&mut (dyn Write + Send)>,
    ) -> Result<Response<A>, AskFailure>
    where
        A: Serialize + DeserializeOwned + JsonSchema + Clone,
    {
        let mut conversation = Conversation::resume(std::mem::take(&mut question.messages));
        match self.converse(question, &mut conversation, sink).await {
            Ok(answer) => Ok(Response {
                answer,
                messages: conversation.into_messages(),
            }),
            Err(error) => {
                warn!(conversation_id = %conversation.id, error = %error, "Question failed");
                Err(AskFailure {
                    error,
                    messages: conversation.into_messages(),
                })
            }
        }
    }

    /// Build the opening messages, then drive the loop to an answer.
    async fn converse<A>(
        &self,
        question: Question<A>,
        conversation: &mut Conversation,
        mut sink: Option<&mut (dyn Write + Send)>,
    ) -> Result<Answer<A>, Error>
    where
        A: Serialize + DeserializeOwned + JsonSchema + Clone,
    {
        let fresh = conversation.is_fresh();
        info!(
            conversation_id = %conversation.id,
            fresh,
            files = question.files.len(),
            tools = question.tools.len(),
            examples = question.examples.len(),
            "Asking question"
        );

        // Tool names are checked before any backend is touched.
        let registry = ToolRegistry::bind(&question.tools)?;

        if fresh {
            for text in &self.preamble {
                conversation.push(Message::system(text));
            }
        }

        let routed = self.router.route_all(&question.files).await?;
        for message in routed.messages {
            conversation.push(message);
        }
        let profile = routed.profile;

        if fresh {
            conversation.push(schema::schema_message::<A>()?);
        }
        if let Some(examples) = schema::examples_message(&question.examples)? {
            conversation.push(examples);
        }
        conversation.push(Message::user(&question.prompt));

        let model = match profile.tier {
            ModelTier::Text => &self.text_model,
            ModelTier::Vision => &self.vision_model,
        };
        let tools = registry.definitions(profile.tier);

        let mut budget = RetryBudget::new(self.max_retries);
        let mut tool_rounds = 0u32;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(
                conversation_id = %conversation.id,
                attempt,
                model = %model,
                messages = conversation.len(),
                "Requesting completion"
            );

            let request = ProviderRequest {
                model: model.clone(),
                messages: conversation.messages().to_vec(),
                temperature: self.temperature,
                max_tokens: profile.max_tokens,
                tools: tools.clone(),
                response_format: profile.response_format,
                stream: sink.is_some(),
            };

            let start = Instant::now();
            let completion = match sink.as_deref_mut() {
                Some(sink) => stream::collect(self.provider.stream(request).await?, sink).await?,
                None => Completion::from(self.provider.complete(request).await?),
            };
            debug!(
                conversation_id = %conversation.id,
                finish_reason = %completion.finish_reason,
                tool_calls = completion.tool_calls.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Completion received"
            );

            match completion.finish_reason {
                FinishReason::ToolCalls => {
                    tool_rounds += 1;
                    if tool_rounds > self.max_tool_rounds {
                        return Err(Error::TooManyToolRounds {
                            rounds: self.max_tool_rounds,
                        });
                    }

                    for call in completion.tool_calls {
                        let start = Instant::now();
                        let result = registry.execute(&call).await?;
                        debug!(
                            tool = %call.name,
                            call_id = %call.id,
                            duration_ms = start.elapsed().as_millis() as u64,
                            "Tool executed"
                        );
                        let id = call.id.clone();
                        conversation.push(Message::tool_invocation(call));
                        conversation.push(Message::tool_result(id, result));
                    }
                }
                FinishReason::Stop => {
                    conversation.push(Message::assistant(&completion.content));
                    match schema::decode_answer::<A>(&completion.content) {
                        Ok(answer) => {
                            info!(
                                conversation_id = %conversation.id,
                                attempt,
                                tool_rounds,
                                retries = budget.failures(),
                                "Answer decoded"
                            );
                            return Ok(answer);
                        }
                        Err(Error::AnswerParse(reason)) => {
                            warn!(
                                conversation_id = %conversation.id,
                                attempt,
                                error = %reason,
                                remaining = budget.remaining().saturating_sub(1),
                                "Could not decode answer"
                            );
                            let corrective = budget.record(reason)?;
                            conversation.push(corrective);
                        }
                        Err(other) => return Err(other),
                    }
                }
                FinishReason::Other(reason) => {
                    return Err(Error::UnhandledFinishReason(reason));
                }
            }
        }
    }
}
