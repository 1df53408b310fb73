use futures::future::BoxFuture;
use serde_json::{json, Map, Value};

use frog_core::error::Result;
use frog_core::schema::{ParamKind, ParameterSchema};
use frog_core::traits::Tool;
use frog_core::{ExecutionContext, LogEntry, NodeResult};

/// `python.exec`: accepts Python source for execution.
///
/// No sandbox backend is wired in, so the code is never run: the tool
/// acknowledges it as a dry run and reports what it received.
pub struct PythonExecTool;

impl Tool for PythonExecTool {
    fn name(&self) -> &str {
        "python.exec"
    }

    fn description(&self) -> &str {
        "Execute Python code (sandboxed, dry run)"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .required("code", ParamKind::String, "Python source")
            .optional("timeout", ParamKind::Integer, "Execution timeout in seconds")
    }

    fn execute(
        &self,
        params: Map<String, Value>,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<NodeResult>> {
        Box::pin(async move {
            let code = params.get("code").and_then(Value::as_str).unwrap_or_default();
            if code.trim().is_empty() {
                return Ok(NodeResult::new().with("error", json!("No code provided")));
            }

            ctx.append_log(LogEntry::tool_info(
                self.name(),
                json!({"code_length": code.len(), "dry_run": true}),
            ))
            .await;

            Ok(NodeResult::new()
                .with("status", json!("success"))
                .with("dry_run", json!(true))
                .with("code_length", json!(code.len()))
                .with(
                    "output",
                    json!(format!("# Received code:\n{}\n\n# Output:\nnot executed (dry run)", code)),
                ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_acknowledges_code() {
        let params = json!({"code": "print(1)"}).as_object().cloned().unwrap();
        let ctx = ExecutionContext::new(None);
        let result = PythonExecTool.execute(params, ctx.clone()).await.unwrap();
        assert!(!result.is_error());
        assert_eq!(result.get("code_length"), Some(&json!(8)));
        assert_eq!(result.get("dry_run"), Some(&json!(true)));
        assert_eq!(ctx.log_len().await, 1);
    }

    #[tokio::test]
    async fn test_blank_code_is_error() {
        let params = json!({"code": "  "}).as_object().cloned().unwrap();
        let result = PythonExecTool
            .execute(params, ExecutionContext::new(None))
            .await
            .unwrap();
        assert_eq!(result.error().as_deref(), Some("No code provided"));
    }
}
