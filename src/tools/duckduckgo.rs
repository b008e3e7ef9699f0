use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use super::{query_arg, SearchResult, Tool};

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";
const MAX_RESULTS: usize = 5;
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Free web search against the DuckDuckGo HTML endpoint.
///
/// Returns at most five results. Provider failures are caught in `execute`
/// and handed back to the model as text.
pub struct DuckDuckGoTool {
    base_url: String,
    user_agent: String,
}

impl DuckDuckGoTool {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: format!("jaunt/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let url = format!("{}/html/?q={}", self.base_url, urlencoding::encode(query));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(self.user_agent.as_str())
            .build()?;

        let response = client.get(&url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!(
                "DuckDuckGo search failed with status: {}",
                response.status()
            );
        }

        let html = response.text().await?;
        parse_results(&html, MAX_RESULTS)
    }
}

impl Default for DuckDuckGoTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract results from the DuckDuckGo HTML page, in page order.
fn parse_results(html: &str, max_results: usize) -> Result<Vec<SearchResult>> {
    // Result links look like: <a class="result__a" href="...">Title</a>
    let link_regex = Regex::new(
        r#"<a[^>]*class="[^"]*result__a[^"]*"[^>]*href="([^"]+)"[^>]*>([\s\S]*?)</a>"#,
    )?;
    // Snippets: <a class="result__snippet">...</a>
    let snippet_regex = Regex::new(r#"<a class="result__snippet[^"]*"[^>]*>([\s\S]*?)</a>"#)?;

    let snippets: Vec<String> = snippet_regex
        .captures_iter(html)
        .take(max_results)
        .map(|caps| strip_tags(&caps[1]).trim().to_string())
        .collect();

    let results = link_regex
        .captures_iter(html)
        .take(max_results)
        .enumerate()
        .map(|(i, caps)| SearchResult {
            title: strip_tags(&caps[2]).trim().to_string(),
            snippet: snippets.get(i).cloned().unwrap_or_default(),
            url: decode_redirect_url(&caps[1]),
        })
        .collect();

    Ok(results)
}

/// DuckDuckGo wraps result URLs in a redirect with the target in `uddg=`.
fn decode_redirect_url(raw_url: &str) -> String {
    if let Some(index) = raw_url.find("uddg=") {
        let encoded = &raw_url[index + 5..];
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        if let Ok(decoded) = urlencoding::decode(encoded) {
            return decoded.into_owned();
        }
    }

    raw_url.to_string()
}

fn strip_tags(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_tag = false;
    for c in content.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[async_trait]
impl Tool for DuckDuckGoTool {
    fn name(&self) -> &str {
        "duckduckgo_search"
    }

    fn description(&self) -> &str {
        "Searches for results in DuckDuckGo web search and returns 5 results"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query to use in DuckDuckGo web search"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> String {
        let Some(query) = query_arg(&args) else {
            return "An error occurred: missing required parameter: query".to_string();
        };

        tracing::info!(query, "duckduckgo search");

        match self.search(query).await {
            Ok(results) if results.is_empty() => format!("No results found for: {query}"),
            Ok(results) => serde_json::to_string_pretty(&results)
                .unwrap_or_else(|e| format!("An error occurred: {e}")),
            Err(e) => {
                tracing::warn!(query, error = %e, "duckduckgo search failed");
                format!("An error occurred: {e}")
            }
        }
    }
}
