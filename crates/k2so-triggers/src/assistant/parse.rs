//! Reading the model's tool decision
//!
//! The model is asked for bare JSON but often wraps it in a fenced block or
//! surrounds it with prose. Parsing is lenient and never an error: anything
//! that doesn't decode is treated as a plain answer.

use serde::Deserialize;
use serde_json::{Map, Value};

/// A structured request from the model to call one tool
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolInvocationRequest {
    #[serde(default)]
    pub use_tool: bool,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
    /// Direct answer when `use_tool` is false
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelDecision {
    UseTool {
        server: String,
        tool: String,
        arguments: Value,
    },
    /// The model declined tools and answered in the expected JSON shape
    Answer(String),
    /// Not the expected JSON at all
    Unstructured,
}

/// Strip a ```json fence and keep the first `{` through the last `}`
fn extract_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed);

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    (start < end).then(|| &unfenced[start..=end])
}

pub fn parse_tool_request(text: &str) -> Option<ToolInvocationRequest> {
    let json = extract_json_object(text)?;
    serde_json::from_str(json).ok()
}

pub fn parse_decision(text: &str) -> ModelDecision {
    match parse_tool_request(text) {
        Some(req) if req.use_tool && !req.server.is_empty() && !req.tool.is_empty() => {
            let arguments = match req.arguments {
                Value::Object(map) => Value::Object(map),
                _ => Value::Object(Map::new()),
            };
            ModelDecision::UseTool {
                server: req.server,
                tool: req.tool,
                arguments,
            }
        }
        Some(ToolInvocationRequest {
            response: Some(answer),
            ..
        }) if !answer.trim().is_empty() => ModelDecision::Answer(answer),
        _ => ModelDecision::Unstructured,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json_request() {
        let decision = parse_decision(
            r#"{"use_tool": true, "server": "time", "tool": "get_current_time", "arguments": {}}"#,
        );
        assert_eq!(
            decision,
            ModelDecision::UseTool {
                server: "time".into(),
                tool: "get_current_time".into(),
                arguments: json!({}),
            }
        );
    }

    #[test]
    fn test_fenced_request_with_prose() {
        let text = "```json\nSure! {\"use_tool\": true, \"server\": \"joke\", \"tool\": \"get_joke_by_index\", \"arguments\": {\"index\": 3}}\n```";
        match parse_decision(text) {
            ModelDecision::UseTool { arguments, .. } => assert_eq!(arguments, json!({"index": 3})),
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn test_non_object_arguments_become_empty() {
        let decision = parse_decision(
            r#"{"use_tool": true, "server": "time", "tool": "get_timestamp", "arguments": null}"#,
        );
        assert!(matches!(
            decision,
            ModelDecision::UseTool { arguments, .. } if arguments == json!({})
        ));
    }

    #[test]
    fn test_declined_tool_with_answer() {
        let decision = parse_decision(r#"{"use_tool": false, "response": "Kubernetes is an orchestrator."}"#);
        assert_eq!(
            decision,
            ModelDecision::Answer("Kubernetes is an orchestrator.".into())
        );
    }

    #[test]
    fn test_unparseable_text() {
        assert_eq!(parse_decision("It is sunny today."), ModelDecision::Unstructured);
        assert_eq!(parse_decision("} backwards {"), ModelDecision::Unstructured);
        assert_eq!(parse_decision("{not json}"), ModelDecision::Unstructured);
        assert_eq!(
            parse_decision(r#"{"use_tool": true, "server": "", "tool": "x"}"#),
            ModelDecision::Unstructured
        );
    }
}
