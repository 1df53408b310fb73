use futures::future::BoxFuture;
use serde_json::{json, Map, Value};

use frog_core::error::Result;
use frog_core::schema::{ParamKind, ParameterSchema};
use frog_core::traits::Tool;
use frog_core::{ExecutionContext, NodeResult};

// ── VarsSetTool ─────────────────────────────────────────────────

/// `vars.set`: write a value into the run's scratch variables.
pub struct VarsSetTool;

impl Tool for VarsSetTool {
    fn name(&self) -> &str {
        "vars.set"
    }

    fn description(&self) -> &str {
        "Store a value in the run's scratch variables"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .required("key", ParamKind::String, "Variable name")
            .required("value", ParamKind::Any, "Value to store")
    }

    fn execute(
        &self,
        params: Map<String, Value>,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<NodeResult>> {
        Box::pin(async move {
            let key = params.get("key").and_then(Value::as_str).unwrap_or_default();
            let value = params.get("value").cloned().unwrap_or(Value::Null);
            ctx.set_variable(key, value.clone()).await;
            Ok(NodeResult::new()
                .with("key", json!(key))
                .with("value", value))
        })
    }
}

// ── VarsGetTool ─────────────────────────────────────────────────

/// `vars.get`: read a scratch variable written earlier in the run.
pub struct VarsGetTool;

impl Tool for VarsGetTool {
    fn name(&self) -> &str {
        "vars.get"
    }

    fn description(&self) -> &str {
        "Read a value from the run's scratch variables"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .required("key", ParamKind::String, "Variable name")
            .optional("default", ParamKind::Any, "Returned when the variable is unset")
    }

    fn execute(
        &self,
        params: Map<String, Value>,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<NodeResult>> {
        Box::pin(async move {
            let key = params.get("key").and_then(Value::as_str).unwrap_or_default();
            let value = match ctx.variable(key).await {
                Some(v) => v,
                None => match params.get("default") {
                    Some(d) => d.clone(),
                    None => {
                        return Ok(NodeResult::new()
                            .with("error", json!(format!("variable '{}' is not set", key))));
                    }
                },
            };
            Ok(NodeResult::new()
                .with("key", json!(key))
                .with("value", value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let ctx = ExecutionContext::new(None);
        VarsSetTool
            .execute(params(json!({"key": "city", "value": "Lisbon"})), ctx.clone())
            .await
            .unwrap();
        let result = VarsGetTool
            .execute(params(json!({"key": "city"})), ctx.clone())
            .await
            .unwrap();
        assert_eq!(result.get("value"), Some(&json!("Lisbon")));
        assert_eq!(ctx.variable("city").await, Some(json!("Lisbon")));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let ctx = ExecutionContext::new(None);
        let missing = VarsGetTool
            .execute(params(json!({"key": "nope"})), ctx.clone())
            .await
            .unwrap();
        assert!(missing.is_error());

        let defaulted = VarsGetTool
            .execute(params(json!({"key": "nope", "default": 3})), ctx)
            .await
            .unwrap();
        assert_eq!(defaulted.get("value"), Some(&json!(3)));
    }
}
