//! In-process tools

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::descriptor::ToolSpec;
use super::error::{ToolError, ToolResult};

/// A function the model can call that runs inside this process
#[async_trait]
pub trait LocalTool: Send + Sync {
    /// Self-description used to build the tool schema
    fn spec(&self) -> &ToolSpec;

    /// Run the tool with parsed JSON arguments
    async fn call(&self, args: Value) -> ToolResult<Value>;
}

impl std::fmt::Debug for dyn LocalTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTool")
            .field("name", &self.spec().name)
            .finish()
    }
}

type BoxedHandler =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = ToolResult<Value>> + Send>> + Send + Sync>;

/// A [`LocalTool`] backed by an async closure
///
/// ```rust,ignore
/// let sum = FunctionTool::new(
///     ToolSpec::new("sum")
///         .doc("Add two integers.")
///         .param(ParamSpec::new("a", ParamType::Integer))
///         .param(ParamSpec::new("b", ParamType::Integer)),
///     |args| async move {
///         let a = args["a"].as_i64().unwrap_or_default();
///         let b = args["b"].as_i64().unwrap_or_default();
///         Ok(json!(a + b))
///     },
/// );
/// ```
#[derive(Clone)]
pub struct FunctionTool {
    spec: ToolSpec,
    handler: BoxedHandler,
}

impl FunctionTool {
    pub fn new<F, Fut>(spec: ToolSpec, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult<Value>> + Send + 'static,
    {
        Self {
            spec,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// Wrap into the shared form the engine takes
    pub fn shared(self) -> Arc<dyn LocalTool> {
        Arc::new(self)
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.spec.name)
            .field("params", &self.spec.params.len())
            .finish()
    }
}

#[async_trait]
impl LocalTool for FunctionTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        check_arguments(&self.spec, &args)?;
        (self.handler)(args).await
    }
}

/// Arguments must be an object holding every required parameter
pub fn check_arguments(spec: &ToolSpec, args: &Value) -> ToolResult<()> {
    let object = args.as_object().ok_or_else(|| {
        ToolError::invalid_arguments(&spec.name, "arguments must be a JSON object")
    })?;

    let missing: Vec<&str> = spec
        .required_params()
        .filter(|name| !object.contains_key(*name))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ToolError::invalid_arguments(
            &spec.name,
            format!("missing required parameter(s): {}", missing.join(", ")),
        ))
    }
}

/// String form of a tool's return value as placed in the transcript
pub fn render_output(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ParamSpec, ParamType};
    use serde_json::json;

    fn sum_tool() -> FunctionTool {
        FunctionTool::new(
            ToolSpec::new("sum")
                .doc("Add two integers.")
                .param(ParamSpec::new("a", ParamType::Integer))
                .param(ParamSpec::new("b", ParamType::Integer)),
            |args| async move {
                let a = args["a"].as_i64().unwrap_or_default();
                let b = args["b"].as_i64().unwrap_or_default();
                Ok(json!(a + b))
            },
        )
    }

    #[tokio::test]
    async fn test_function_tool_call() {
        let tool = sum_tool();
        let out = tool.call(json!({"a": 2, "b": 3})).await.unwrap();
        assert_eq!(render_output(&out), "5");
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let tool = sum_tool();
        let err = tool.call(json!({"a": 2})).await.unwrap_err();
        assert_eq!(
            err,
            ToolError::invalid_arguments("sum", "missing required parameter(s): b")
        );

        let err = tool.call(json!([2, 3])).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn test_render_output() {
        assert_eq!(render_output(&json!("Chantilly, VA 20152")), "Chantilly, VA 20152");
        assert_eq!(render_output(&json!(412.5)), "412.5");
        assert_eq!(render_output(&Value::Null), "");
        assert_eq!(render_output(&json!({"ok": true})), r#"{"ok":true}"#);
    }
}
