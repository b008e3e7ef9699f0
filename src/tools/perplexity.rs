use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{query_arg, Tool};

const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_MODEL: &str = "llama-3.1-sonar-small-128k-online";

#[derive(Serialize)]
struct PerplexityMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct PerplexityRequest {
    model: String,
    messages: Vec<PerplexityMessage>,
}

#[derive(Deserialize)]
struct PerplexityChoice {
    message: PerplexityResponseMessage,
}

#[derive(Deserialize)]
struct PerplexityResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct PerplexityResponse {
    choices: Vec<PerplexityChoice>,
}

/// Hosted search via the Perplexity online model. The model browses the web
/// itself and answers with sources, so the tool output is a prose answer
/// rather than a result list.
pub struct PerplexityTool {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl PerplexityTool {
    /// A missing key is not validated here; it surfaces as an auth failure
    /// from the API, which `execute` folds into the tool output.
    pub fn new(api_key: Option<String>, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    async fn ask(&self, query: &str) -> Result<String> {
        let request = PerplexityRequest {
            model: self.model.clone(),
            messages: vec![PerplexityMessage {
                role: "user".to_string(),
                content: query.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.as_deref().unwrap_or_default()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Perplexity API error {}: {}", status, text));
        }

        let perplexity_response: PerplexityResponse = response.json().await?;
        perplexity_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("Perplexity returned no choices"))
    }
}

#[async_trait]
impl Tool for PerplexityTool {
    fn name(&self) -> &str {
        "perplexity_search"
    }

    fn description(&self) -> &str {
        "Searches the web with the Perplexity online model and returns a sourced answer"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query to send to Perplexity"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> String {
        let Some(query) = query_arg(&args) else {
            return "An error occurred: missing required parameter: query".to_string();
        };

        tracing::info!(query, "perplexity search");

        match self.ask(query).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(query, error = %e, "perplexity search failed");
                format!("An error occurred: {e}")
            }
        }
    }
}
