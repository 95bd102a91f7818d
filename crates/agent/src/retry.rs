//! Bounded re-prompting after malformed answers.

use llmask_core::error::Error;
use llmask_core::message::Message;

/// A run-wide budget of answer parse failures.
///
/// Every failure is recorded; once `max_failures` have been recorded the
/// run is over and [`Error::TooManyRetries`] carries all of them.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    max_failures: usize,
    errors: Vec<String>,
}

impl RetryBudget {
    pub fn new(max_failures: usize) -> Self {
        Self {
            max_failures: max_failures.max(1),
            errors: Vec::new(),
        }
    }

    /// Record a parse failure.
    ///
    /// Returns the corrective message to append before the next attempt, or
    /// `TooManyRetries` when the budget is spent.
    pub fn record(&mut self, error: impl Into<String>) -> Result<Message, Error> {
        let error = error.into();
        let corrective = corrective_message(&error);
        self.errors.push(error);
        if self.errors.len() >= self.max_failures {
            return Err(Error::TooManyRetries {
                errors: std::mem::take(&mut self.errors),
            });
        }
        Ok(corrective)
    }

    pub fn failures(&self) -> usize {
        self.errors.len()
    }

    pub fn remaining(&self) -> usize {
        self.max_failures - self.errors.len()
    }
}

/// Ask the model to re-emit its answer as clean JSON.
pub fn corrective_message(error: &str) -> Message {
    Message::user(format!(
        "oops, i got an error parsing your response as json: {error}. could you please re-do with correct json having no extraneous characters, etc?"
    ))
}
