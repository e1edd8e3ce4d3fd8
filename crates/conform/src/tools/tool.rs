use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::future::Future;

use crate::schema::SchemaType;

/// A named capability the backend can invoke during a generation
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the backend uses in `toolCall: <name>(...)`
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Object schema the arguments are validated against before `execute` runs.
    /// Keys the schema does not declare still reach `execute`.
    fn parameters(&self) -> &SchemaType;

    /// Run the tool. The returned text becomes the observation fed back to the backend.
    async fn execute(&self, arguments: Map<String, Value>) -> Result<String>;
}

type ToolFn = Box<dyn Fn(Map<String, Value>) -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// A tool backed by an async closure
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: SchemaType,
    func: ToolFn,
}

impl FunctionTool {
    pub fn new<N, D, F, Fut>(name: N, description: D, parameters: SchemaType, func: F) -> Self
    where
        N: Into<String>,
        D: Into<String>,
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            func: Box::new(move |arguments| Box::pin(func(arguments))),
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &SchemaType {
        &self.parameters
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<String> {
        (self.func)(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_function_tool_executes_closure() -> Result<()> {
        let tool = FunctionTool::new(
            "count_words",
            "Count the number of words in text",
            SchemaType::object().field("text", SchemaType::string()),
            |args: Map<String, Value>| async move {
                let text = args.get("text").and_then(|v| v.as_str()).unwrap_or_default();
                Ok(text.split_whitespace().count().to_string())
            },
        );

        assert_eq!(tool.name(), "count_words");
        assert_eq!(tool.description(), "Count the number of words in text");
        assert_eq!(tool.parameters().kind(), "object");

        let mut args = Map::new();
        args.insert("text".to_string(), json!("three little words"));
        let output = tokio_test::block_on(tool.execute(args))?;
        assert_eq!(output, "3");
        Ok(())
    }
}
