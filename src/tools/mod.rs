use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod duckduckgo;
pub mod perplexity;

pub use duckduckgo::DuckDuckGoTool;
pub use perplexity::PerplexityTool;

/// A single web search hit, kept in provider order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Self-description of a tool, sent to the model so it can decide when
/// and how to invoke it. This is the whole contract the model sees.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A callable capability exposed to the language model.
///
/// `execute` always returns text: failures are folded into the returned
/// string so the agent can reason about them instead of crashing the chat.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(&self, args: serde_json::Value) -> String;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Pull the required `query` argument out of a tool call's arguments.
pub(crate) fn query_arg(args: &serde_json::Value) -> Option<&str> {
    args.get("query")
        .and_then(|q| q.as_str())
        .map(str::trim)
        .filter(|q| !q.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_arg_present() {
        let args = json!({"query": "Eiffel Tower"});
        assert_eq!(query_arg(&args), Some("Eiffel Tower"));
    }

    #[test]
    fn test_query_arg_trims_whitespace() {
        let args = json!({"query": "  Eiffel Tower  "});
        assert_eq!(query_arg(&args), Some("Eiffel Tower"));
    }

    #[test]
    fn test_query_arg_missing() {
        assert_eq!(query_arg(&json!({})), None);
    }

    #[test]
    fn test_query_arg_empty() {
        assert_eq!(query_arg(&json!({"query": "   "})), None);
    }
}
