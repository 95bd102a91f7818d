//! `llmask story`: an interactive conversation that keeps its history.
//!
//! Each answer's message log seeds the next question, so only the first
//! turn carries the preamble and schema.

use llmask_core::{Message, Question};
use llmask_tools::StoryConcept;
use llmask_tools::story::OPENING_PROMPT;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (asker, config) = super::setup()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut messages: Vec<Message> = Vec::new();
    let mut prompt = OPENING_PROMPT.to_string();

    loop {
        let question = Question::<StoryConcept>::new(&prompt).continuing(messages);
        let response = super::ask(&asker, question, config.ask.stream).await?;
        if !config.ask.stream {
            println!("{}", response.answer);
        }
        messages = response.messages;

        print!("\n> ");
        use std::io::Write;
        std::io::stdout().flush()?;

        match lines.next_line().await? {
            Some(line) => prompt = line.trim().to_string(),
            None => {
                println!();
                return Ok(());
            }
        }
    }
}
