//! The answer envelope every model response must conform to.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// A free-form narrative plus the strongly-typed answer.
///
/// Unknown envelope fields are rejected here. The reply decoder rejects
/// unknown fields at any depth, whether or not `A` denies them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Answer<A> {
    /// Free-form, high-level answer to the question.
    pub conversational_answer: String,
    /// Formal answer to the question, in a specific schema.
    pub formal_answer: A,
}

impl<A: Serialize> std::fmt::Display for Answer<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?;
        f.write_str(&json)
    }
}

/// A successful answer together with the full conversation log.
#[derive(Debug, Clone)]
pub struct Response<A> {
    pub answer: Answer<A>,
    pub messages: Vec<Message>,
}
