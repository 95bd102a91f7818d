//! `llmask arithmetic`: tool calling with worked examples.

use llmask_core::{Question, Response};
use llmask_tools::ArithmeticAnswer;

const DEFAULT_QUESTION: &str = "what is 5 * (455342+22342.6)^1.1 * 99?";

/// The arithmetic question with every tool and example attached.
pub fn build_question(prompt: &str) -> Question<ArithmeticAnswer> {
    let mut question = Question::new(prompt);
    for tool in llmask_tools::arithmetic_tools() {
        question = question.with_tool(tool);
    }
    for example in llmask_tools::arithmetic::examples() {
        question = question.with_example(example);
    }
    question
}

pub async fn run(prompt: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let (asker, config) = super::setup()?;
    let prompt = prompt.unwrap_or_else(|| DEFAULT_QUESTION.to_string());
    println!("question: {prompt:?}");

    let response = super::ask(&asker, build_question(&prompt), config.ask.stream).await?;
    print_response(&response)?;
    Ok(())
}

fn print_response(response: &Response<ArithmeticAnswer>) -> Result<(), serde_json::Error> {
    println!("conversational: {:?}", response.answer.conversational_answer);
    println!("formal: {:?}", response.answer.formal_answer.answer);
    println!("difficulty: {:?}", response.answer.formal_answer.difficulty_rating);
    for message in &response.messages {
        println!("{}", serde_json::to_string_pretty(message)?);
    }
    Ok(())
}
