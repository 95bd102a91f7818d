//! Answer type for the interactive story-concept conversation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Opening prompt of a story conversation.
pub const OPENING_PROMPT: &str = "create a short story concept for me";

/// A short story concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StoryConcept {
    pub story_title: String,
    pub actors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_decoding() {
        let ok: StoryConcept =
            serde_json::from_str(r#"{"story_title": "Tides", "actors": ["Mara"]}"#).unwrap();
        assert_eq!(ok.actors, vec!["Mara".to_string()]);

        assert!(
            serde_json::from_str::<StoryConcept>(r#"{"story_title": "Tides", "actors": [], "genre": "x"}"#)
                .is_err()
        );
    }
}
