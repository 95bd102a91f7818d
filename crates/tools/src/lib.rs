//! Demo tools and answer types for llmask.
//!
//! The arithmetic tools show the tool round-trip: the model delegates each
//! computation to `sum`, `mult` or `exp` before answering.

pub mod arithmetic;
pub mod story;

use std::sync::Arc;

use llmask_core::tool::Tool;

pub use arithmetic::{ArithmeticAnswer, Exp, Mult, Sum};
pub use story::StoryConcept;

/// All arithmetic tools, ready for `Question::with_tool`.
pub fn arithmetic_tools() -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(Sum), Arc::new(Mult), Arc::new(Exp)]
}
