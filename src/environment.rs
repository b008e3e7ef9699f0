use std::sync::Arc;

use crate::tools::{Tool, ToolSpec};

/// Language-model backend descriptor. Credentials come from the process
/// environment (or the config file) and are never validated up front.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub api_key: Option<String>,
}

impl LlmConfig {
    pub fn openai(model: &str, api_key: Option<String>) -> Self {
        Self {
            provider: "openai".to_string(),
            model: model.to_string(),
            temperature: 0.2,
            top_p: 0.9,
            api_key,
        }
    }
}

/// Feature flags understood by the agent runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feature {
    ShortTermMemory,
    ToolCalling { max_tries: u32 },
}

/// Connection descriptor for the external document store. Passed through
/// to the environment but never dialed in this scope.
#[derive(Debug, Clone)]
pub struct DatastoreConfig {
    pub uri: String,
    pub database: String,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017/".to_string(),
            database: "agent".to_string(),
        }
    }
}

/// The declarative bundle an [`Agent`](crate::agent::Agent) is built from:
/// model backend, callable tools, and feature flags.
pub struct Environment {
    pub llm: LlmConfig,
    pub tools: Vec<Arc<dyn Tool>>,
    pub features: Vec<Feature>,
    pub datastore: DatastoreConfig,
}

impl Environment {
    /// Bounded tool-call rounds. One round when tool calling is not
    /// explicitly enabled.
    pub fn max_tool_tries(&self) -> u32 {
        self.features
            .iter()
            .find_map(|f| match f {
                Feature::ToolCalling { max_tries } => Some(*max_tries),
                _ => None,
            })
            .unwrap_or(1)
    }

    pub fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }
}
