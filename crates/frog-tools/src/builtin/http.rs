use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::{json, Map, Value};

use frog_core::error::{FrogError, Result};
use frog_core::schema::{ParamKind, ParameterSchema};
use frog_core::traits::Tool;
use frog_core::{ExecutionContext, LogEntry, NodeResult};

/// `http.request`: call an HTTP endpoint.
pub struct HttpRequestTool {
    timeout_secs: u64,
    max_body_chars: usize,
}

impl HttpRequestTool {
    pub fn new(timeout_secs: u64, max_body_chars: usize) -> Self {
        Self {
            timeout_secs,
            max_body_chars,
        }
    }

    fn failed(message: impl ToString) -> FrogError {
        FrogError::ToolExecution {
            tool: "http.request".into(),
            message: message.to_string(),
        }
    }
}

/// Keep at most `max` characters, respecting char boundaries.
fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

impl Tool for HttpRequestTool {
    fn name(&self) -> &str {
        "http.request"
    }

    fn description(&self) -> &str {
        "Make HTTP requests to APIs"
    }

    fn timeout_secs(&self) -> u64 {
        self.timeout_secs + 5
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .required("url", ParamKind::String, "Target URL")
            .optional("method", ParamKind::String, "HTTP method (default: GET)")
            .optional("headers", ParamKind::Object, "Request headers")
            .optional("data", ParamKind::Any, "JSON request body")
            .optional("timeout", ParamKind::Integer, "Request timeout in seconds")
    }

    fn execute(
        &self,
        params: Map<String, Value>,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<NodeResult>> {
        Box::pin(async move {
            let url = params
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if url.is_empty() {
                return Ok(NodeResult::new().with("error", json!("No URL provided")));
            }
            let method = params
                .get("method")
                .and_then(Value::as_str)
                .unwrap_or("GET")
                .to_uppercase();
            let timeout = params
                .get("timeout")
                .and_then(Value::as_u64)
                .unwrap_or(self.timeout_secs)
                .min(self.timeout_secs);

            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout))
                .build()
                .map_err(Self::failed)?;

            let parsed_method = method
                .parse::<reqwest::Method>()
                .map_err(|e| FrogError::ToolValidation(format!("Invalid method: {}", e)))?;

            let mut req = client.request(parsed_method, &url);
            if let Some(headers) = params.get("headers").and_then(Value::as_object) {
                for (k, v) in headers {
                    let value = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    req = req.header(k.as_str(), value);
                }
            }
            match params.get("data") {
                Some(Value::Null) | None => {}
                Some(data) => req = req.json(data),
            }

            let resp = req.send().await.map_err(Self::failed)?;
            let status = resp.status().as_u16();
            let final_url = resp.url().to_string();
            let headers: Map<String, Value> = resp
                .headers()
                .iter()
                .map(|(k, v)| {
                    (
                        k.to_string(),
                        Value::String(v.to_str().unwrap_or("?").to_string()),
                    )
                })
                .collect();
            let body = resp.text().await.map_err(Self::failed)?;

            ctx.append_log(LogEntry::tool_info(
                self.name(),
                json!({"method": method, "url": url, "status_code": status}),
            ))
            .await;

            Ok(NodeResult::new()
                .with("status_code", json!(status))
                .with("headers", Value::Object(headers))
                .with("text", Value::String(truncate_chars(&body, self.max_body_chars)))
                .with("url", Value::String(final_url)))
        })
    }
}
