//! Arithmetic tools: `sum`, `mult` and `exp`.
//!
//! Each tool parses its JSON arguments strictly and returns the result
//! formatted with six decimal places.

use async_trait::async_trait;
use llmask_core::error::ToolError;
use llmask_core::provider::ToolDefinition;
use llmask_core::question::Example;
use llmask_core::tool::Tool;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::trace;

/// Structured answer to an arithmetic question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ArithmeticAnswer {
    pub answer: String,
    pub difficulty_rating: String,
}

/// The worked examples shown to the model alongside an arithmetic question.
pub fn examples() -> Vec<Example<ArithmeticAnswer>> {
    vec![
        Example::new(
            "what is 7 + 3?",
            ArithmeticAnswer {
                answer: "10".into(),
                difficulty_rating: "easy".into(),
            },
        ),
        Example::new(
            "what is (10*2)^2?",
            ArithmeticAnswer {
                answer: "400".into(),
                difficulty_rating: "medium".into(),
            },
        ),
    ]
}

/// JSON schema of a tool's argument type, as sent in its definition.
fn parameters_for<T: JsonSchema>() -> serde_json::Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default();
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    schema
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: &str) -> Result<T, ToolError> {
    trace!(tool, arguments, "Parsing tool arguments");
    serde_json::from_str(arguments)
        .map_err(|e| ToolError::InvalidArguments(format!("{tool}: {e}")))
}

fn format_number(value: f64) -> String {
    format!("{value:.6}")
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct SumArgs {
    /// Numbers to add together
    addends: Vec<f64>,
}

/// Adds numbers.
pub struct Sum;

#[async_trait]
impl Tool for Sum {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "sum".into(),
            description: "adds numbers".into(),
            parameters: parameters_for::<SumArgs>(),
        }
    }

    async fn compute(&self, arguments: &str) -> Result<String, ToolError> {
        let args: SumArgs = parse_args("sum", arguments)?;
        Ok(format_number(args.addends.iter().sum()))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct MultArgs {
    /// Numbers to multiply together
    multiplicands: Vec<f64>,
}

/// Multiplies numbers.
pub struct Mult;

#[async_trait]
impl Tool for Mult {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "mult".into(),
            description: "multiplies numbers".into(),
            parameters: parameters_for::<MultArgs>(),
        }
    }

    async fn compute(&self, arguments: &str) -> Result<String, ToolError> {
        let args: MultArgs = parse_args("mult", arguments)?;
        Ok(format_number(args.multiplicands.iter().product()))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct ExpArgs {
    base: f64,
    power: f64,
}

/// Raises a base to a power.
pub struct Exp;

#[async_trait]
impl Tool for Exp {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "exp".into(),
            description: "exponentiation".into(),
            parameters: parameters_for::<ExpArgs>(),
        }
    }

    async fn compute(&self, arguments: &str) -> Result<String, ToolError> {
        let args: ExpArgs = parse_args("exp", arguments)?;
        let value = args.base.powf(args.power);
        if !value.is_finite() {
            return Err(ToolError::ExecutionFailed {
                tool_name: "exp".into(),
                reason: format!("{}^{} is not a finite number", args.base, args.power),
            });
        }
        Ok(format_number(value))
    }
}
