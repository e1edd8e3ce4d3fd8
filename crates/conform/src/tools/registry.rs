use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::error::{ToolError, ToolResult};
use super::tool::Tool;
use crate::errors::{AgentError, AgentResult};
use crate::guard::{guard, Interrupted};
use crate::models::tool::ToolCall;
use crate::prompt_template::load_prompt;
use crate::schema::{describe, validate, ParsedOutcome, SchemaError, SchemaType};

const TOOLS_TEMPLATE: &str = include_str!("../prompts/tools.md");

#[derive(Serialize)]
struct ToolInfo<'a> {
    name: &'a str,
    description: &'a str,
    parameters: String,
}

/// The tools available to one agent, looked up by name
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Names must be unique and parameters must be an object schema.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> AgentResult<()> {
        if self.get(tool.name()).is_some() {
            return Err(AgentError::DuplicateTool(tool.name().to_string()));
        }
        let parameters = tool.parameters();
        if !matches!(parameters, SchemaType::Object { .. }) {
            return Err(SchemaError::NotAnObject(parameters.kind().to_string()).into());
        }
        parameters.check()?;
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|tool| tool.name() == name)
            .map(|tool| &**tool)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Render the tool catalogue and calling instructions for the system prompt
    pub fn describe(&self) -> Result<String, tera::Error> {
        let tools: Vec<ToolInfo> = self
            .tools
            .iter()
            .map(|tool| ToolInfo {
                name: tool.name(),
                description: tool.description(),
                parameters: describe(tool.parameters()),
            })
            .collect();
        load_prompt(TOOLS_TEMPLATE, &serde_json::json!({ "tools": tools }))
    }

    /// Validate the call's arguments against the tool's parameters, then execute it
    pub async fn dispatch(
        &self,
        call: &ToolCall,
        cancel: &CancellationToken,
        timeout: Option<Duration>,
    ) -> ToolResult<String> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        // Validation gates the call; the tool still receives the arguments as sent
        let arguments = Value::Object(call.arguments.clone());
        if let ParsedOutcome::Failure(errors) = validate(tool.parameters(), &arguments) {
            return Err(ToolError::InvalidParameters {
                tool: call.name.clone(),
                errors,
            });
        }

        match guard(tool.execute(call.arguments.clone()), cancel, timeout).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(ToolError::Execution {
                tool: call.name.clone(),
                message: e.to_string(),
            }),
            Err(Interrupted::Cancelled) => Err(ToolError::Cancelled(call.name.clone())),
            Err(Interrupted::TimedOut(after)) => Err(ToolError::Timeout {
                tool: call.name.clone(),
                after,
            }),
        }
    }
}
