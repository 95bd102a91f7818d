//! Questions and the background material attached to them.

use std::collections::HashMap;
use std::sync::Arc;
use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::tool::Tool;

/// A background artifact; its content type decides how it is ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    pub content: Vec<u8>,
    /// MIME type, matched exactly (no parameters).
    pub content_type: String,
}

impl File {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            content_type: content_type.into(),
        }
    }
}

/// A fictitious answer shown to the model as guidance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Example<A> {
    /// The prompt the example answers, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub answer: A,
}

impl<A> Example<A> {
    pub fn new(prompt: impl Into<String>, answer: A) -> Self {
        Self {
            prompt: Some(prompt.into()),
            answer,
        }
    }

    pub fn answer_only(answer: A) -> Self {
        Self { prompt: None, answer }
    }
}

/// A question whose answer must have the shape `A`.
///
/// `messages` holds the log returned by a previous question; leaving it
/// empty starts a fresh conversation.
pub struct Question<A> {
    pub prompt: String,
    pub files: Vec<File>,
    pub examples: Vec<Example<A>>,
    pub tools: HashMap<String, Arc<dyn Tool>>,
    pub messages: Vec<Message>,
}

impl<A> Question<A> {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            files: Vec::new(),
            examples: Vec::new(),
            tools: HashMap::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: File) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_example(mut self, example: Example<A>) -> Self {
        self.examples.push(example);
        self
    }

    /// Register a tool under its own definition name.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(tool.definition().name, tool);
        self
    }

    /// Continue the conversation a previous answer returned.
    pub fn continuing(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }
}

impl<A: std::fmt::Debug> std::fmt::Debug for Question<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tools: Vec<_> = self.tools.keys().collect();
        tools.sort();
        f.debug_struct("Question")
            .field("prompt", &self.prompt)
            .field("files", &self.files.iter().map(|d| &d.name).collect::<Vec<_>>())
            .field("examples", &self.examples)
            .field("tools", &tools)
            .field("messages", &self.messages.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_everything() {
        let q: Question<u32> = Question::new("what is 2+2?")
            .with_file(File::new("notes.txt", "four", "text/plain"))
            .with_example(Example::new("what is 1+1?", 2))
            .with_example(Example::answer_only(3))
            .continuing(vec![Message::user("hi")]);

        assert_eq!(q.prompt, "what is 2+2?");
        assert_eq!(q.files[0].content, b"four");
        assert_eq!(q.examples.len(), 2);
        assert!(q.examples[1].prompt.is_none());
        assert_eq!(q.messages.len(), 1);
        assert!(format!("{q:?}").contains("notes.txt"));
    }
}
