use futures::future::BoxFuture;
use serde_json::{json, Map, Value};
use tracing::debug;

use frog_core::error::{FrogError, Result};
use frog_core::schema::{ParamKind, ParameterSchema};
use frog_core::traits::Tool;
use frog_core::{ExecutionContext, LogEntry, NodeResult};

const TAVILY_URL: &str = "https://api.tavily.com/search";
const TAVILY_SECRET: &str = "TAVILY_API_KEY";

/// `browser.search`: web search.
///
/// Queries Tavily when the run carries a `TAVILY_API_KEY` secret; otherwise
/// returns placeholder results so workflows stay runnable offline.
pub struct BrowserSearchTool {
    http: reqwest::Client,
    results_cap: usize,
}

impl BrowserSearchTool {
    pub fn new(results_cap: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            results_cap,
        }
    }

    fn placeholder_results(query: &str, count: usize) -> Vec<Value> {
        (1..=count)
            .map(|i| {
                json!({
                    "title": format!("Search result {} for: {}", i, query),
                    "url": format!("https://example.com/result-{}", i),
                    "snippet": format!("Placeholder snippet for query '{}'. Result number {}.", query, i),
                })
            })
            .collect()
    }

    async fn tavily(&self, api_key: &str, query: &str, max: usize) -> Result<Vec<Value>> {
        let resp = self
            .http
            .post(TAVILY_URL)
            .json(&json!({
                "api_key": api_key,
                "query": query,
                "max_results": max,
            }))
            .send()
            .await
            .map_err(|e| FrogError::ToolExecution {
                tool: "browser.search".into(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| FrogError::ToolExecution {
            tool: "browser.search".into(),
            message: e.to_string(),
        })?;
        parse_tavily(status, &body, max)
    }
}

/// Map a Tavily response to result entries. Non-2xx answers are failures.
fn parse_tavily(status: reqwest::StatusCode, body: &str, max: usize) -> Result<Vec<Value>> {
    if !status.is_success() {
        let detail: String = body.chars().take(200).collect();
        return Err(FrogError::ToolExecution {
            tool: "browser.search".into(),
            message: format!("HTTP {}: {}", status, detail),
        });
    }

    let body: Value = serde_json::from_str(body).map_err(|e| FrogError::ToolExecution {
        tool: "browser.search".into(),
        message: format!("invalid response: {}", e),
    })?;
    Ok(body["results"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .take(max)
                .map(|r| {
                    json!({
                        "title": r["title"].as_str().unwrap_or(""),
                        "url": r["url"].as_str().unwrap_or(""),
                        "snippet": r["content"].as_str().unwrap_or(""),
                    })
                })
                .collect()
        })
        .unwrap_or_default())
}

impl Tool for BrowserSearchTool {
    fn name(&self) -> &str {
        "browser.search"
    }

    fn description(&self) -> &str {
        "Search the web for information"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .required("query", ParamKind::String, "Search query")
            .optional("max_results", ParamKind::Integer, "Maximum number of results (default 5)")
    }

    fn execute(
        &self,
        params: Map<String, Value>,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<NodeResult>> {
        Box::pin(async move {
            let query = params
                .get("query")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();
            if query.is_empty() {
                return Ok(NodeResult::new().with("error", json!("No search query provided")));
            }
            let requested = params
                .get("max_results")
                .and_then(Value::as_u64)
                .unwrap_or(5) as usize;
            let max = requested.min(self.results_cap);

            let (results, source) = match ctx.secret(TAVILY_SECRET) {
                Some(key) => (self.tavily(key, &query, max).await?, "tavily"),
                None => (Self::placeholder_results(&query, max), "placeholder"),
            };
            debug!(query = %query, count = results.len(), source, "Search complete");

            ctx.append_log(LogEntry::tool_info(
                self.name(),
                json!({"query": query, "results_count": results.len(), "source": source}),
            ))
            .await;

            Ok(NodeResult::new()
                .with("results", Value::Array(results))
                .with("query", Value::String(query)))
        })
    }
}
