//! The answer contract: schema injection, worked examples and strict
//! decoding of the model's reply.

use llmask_core::answer::Answer;
use llmask_core::error::Error;
use llmask_core::message::Message;
use llmask_core::question::Example;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Pretty-printed JSON schema of `Answer<A>`.
pub fn answer_schema<A: JsonSchema>() -> Result<String, Error> {
    let schema = schemars::schema_for!(Answer<A>);
    Ok(serde_json::to_string_pretty(&schema)?)
}

/// The message telling the model what shape its reply must take.
pub fn schema_message<A: JsonSchema>() -> Result<Message, Error> {
    Ok(Message::user(format!(
        "the schema of your json answer must match: {}",
        answer_schema::<A>()?
    )))
}

/// Generic narrative for a worked example.
fn example_narrative(prompt: Option<&str>) -> String {
    match prompt {
        Some(prompt) => collapse_whitespace(&format!(
            "freeform text about answering question {:?}",
            collapse_whitespace(prompt)
        )),
        None => "freeform text about answering the question".into(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All examples rendered as complete envelopes in one message, or `None`
/// when there are no examples.
pub fn examples_message<A: Serialize + Clone>(
    examples: &[Example<A>],
) -> Result<Option<Message>, Error> {
    if examples.is_empty() {
        return Ok(None);
    }

    let mut text = format!(
        "here are {} fictitious example(s) for how your json responses may look like in practice:\n\n",
        examples.len()
    );
    for (i, example) in examples.iter().enumerate() {
        let envelope = Answer {
            conversational_answer: example_narrative(example.prompt.as_deref()),
            formal_answer: example.answer.clone(),
        };
        let json = serde_json::to_string_pretty(&envelope)?;
        match &example.prompt {
            Some(prompt) => text.push_str(&format!(
                "example #{} in response to prompt {:?}: {}\n\n",
                i + 1,
                prompt,
                json
            )),
            None => text.push_str(&format!("example #{}: {}\n\n", i + 1, json)),
        }
    }

    Ok(Some(Message::user(text)))
}

/// Trim whitespace and a surrounding markdown code fence.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Decode the model's reply strictly as `Answer<A>`.
///
/// A field the target types do not declare is an error at any depth, even
/// inside an `A` that would otherwise ignore it. Fails with
/// [`Error::AnswerParse`], the only recoverable error.
pub fn decode_answer<A: DeserializeOwned>(raw: &str) -> Result<Answer<A>, Error> {
    let parse_error = |e: serde_json::Error| Error::AnswerParse(e.to_string());

    let mut de = serde_json::Deserializer::from_str(strip_code_fence(raw));
    let mut unknown = Vec::new();
    let answer: Answer<A> =
        serde_ignored::deserialize(&mut de, |path| unknown.push(path.to_string()))
            .map_err(parse_error)?;
    de.end().map_err(parse_error)?;

    if !unknown.is_empty() {
        return Err(Error::AnswerParse(format!(
            "unknown field(s): {}",
            unknown.join(", ")
        )));
    }
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
    #[serde(deny_unknown_fields)]
    struct Verdict {
        answer: String,
        difficulty_rating: String,
    }

    #[test]
    fn schema_message_embeds_the_envelope_schema() {
        let msg = schema_message::<Verdict>().unwrap();
        assert!(msg.content.starts_with("the schema of your json answer must match: {"));
        assert!(msg.content.contains("conversational_answer"));
        assert!(msg.content.contains("difficulty_rating"));
    }

    #[test]
    fn examples_render_as_full_envelopes() {
        let examples = vec![
            Example::new(
                "what is\n  7 + 3?",
                Verdict { answer: "10".into(), difficulty_rating: "easy".into() },
            ),
            Example::answer_only(Verdict {
                answer: "400".into(),
                difficulty_rating: "medium".into(),
            }),
        ];
        let msg = examples_message(&examples).unwrap().unwrap();
        let text = &msg.content;

        assert!(text.starts_with("here are 2 fictitious example(s)"));
        assert!(text.contains("example #1 in response to prompt \"what is\\n  7 + 3?\": {"));
        assert!(text.contains("freeform text about answering question \\\"what is 7 + 3?\\\""));
        assert!(text.contains("example #2: {"));
        assert!(text.contains("freeform text about answering the question"));
        assert!(text.contains("\"difficulty_rating\": \"medium\""));
    }

    #[test]
    fn no_examples_no_message() {
        assert!(examples_message::<Verdict>(&[]).unwrap().is_none());
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fence("  ```json\n{\"a\":1}\n```  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("\n{}\n"), "{}");
    }

    #[test]
    fn decoding_is_strict() {
        let ok = r#"```json
{"conversational_answer": "ten", "formal_answer": {"answer": "10", "difficulty_rating": "easy"}}
```"#;
        let answer: Answer<Verdict> = decode_answer(ok).unwrap();
        assert_eq!(answer.formal_answer.answer, "10");

        let extra = r#"{"conversational_answer": "ten", "formal_answer": {"answer": "10", "difficulty_rating": "easy"}, "mood": "happy"}"#;
        let err = decode_answer::<Verdict>(extra).unwrap_err();
        assert!(matches!(err, Error::AnswerParse(ref msg) if msg.contains("mood")));

        let nested_extra = r#"{"conversational_answer": "ten", "formal_answer": {"answer": "10", "difficulty_rating": "easy", "x": 1}}"#;
        assert!(decode_answer::<Verdict>(nested_extra).is_err());
    }

    /// An answer type without `deny_unknown_fields`.
    #[derive(Debug, Deserialize)]
    struct Lenient {
        answer: String,
        steps: Vec<Step>,
    }

    #[derive(Debug, Deserialize)]
    struct Step {
        op: String,
    }

    #[test]
    fn unknown_fields_are_rejected_below_the_envelope() {
        let extra = r#"{"conversational_answer": "x", "formal_answer": {"answer": "4", "steps": [], "confidence": 0.9}}"#;
        let err = decode_answer::<Lenient>(extra).unwrap_err();
        assert!(
            matches!(err, Error::AnswerParse(ref msg) if msg.contains("formal_answer.confidence"))
        );

        let deep = r#"{"conversational_answer": "x", "formal_answer": {"answer": "4", "steps": [{"op": "add", "note": "easy"}]}}"#;
        let err = decode_answer::<Lenient>(deep).unwrap_err();
        assert!(matches!(err, Error::AnswerParse(ref msg) if msg.contains("note")));

        let clean = r#"{"conversational_answer": "x", "formal_answer": {"answer": "4", "steps": [{"op": "add"}]}}"#;
        let answer = decode_answer::<Lenient>(clean).unwrap().formal_answer;
        assert_eq!(answer.answer, "4");
        assert_eq!(answer.steps[0].op, "add");
    }

    #[test]
    fn trailing_text_is_rejected() {
        let raw = r#"{"conversational_answer": "x", "formal_answer": {"answer": "1", "difficulty_rating": "easy"}} thanks!"#;
        assert!(matches!(decode_answer::<Verdict>(raw), Err(Error::AnswerParse(_))));
    }
}
