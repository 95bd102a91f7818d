//! The question/answer loop, the heart of llmask.
//!
//! An [`Asker`] turns a typed [`Question`](llmask_core::Question) into a
//! conversation and drives it to a schema-checked answer:
//!
//! 1. **Bind** the caller's tools (names must match their definitions)
//! 2. **Route** background files into messages ([`router`])
//! 3. **Inject** the answer schema and worked examples ([`schema`])
//! 4. **Complete**, executing tool calls and feeding results back
//! 5. **Decode** the reply strictly, re-prompting within a [`RetryBudget`]
//!
//! The conversation log is returned on success and on failure, so a caller
//! can inspect it or continue it with a follow-up question.

pub mod ask;
pub mod retry;
pub mod router;
pub mod schema;
pub mod stream;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use ask::{AskFailure, Asker};
pub use retry::RetryBudget;
pub use router::{ContentKind, ContentRouter, RequestProfile, RoutedFiles};
pub use stream::{Completion, FanOut};
