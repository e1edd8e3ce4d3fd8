use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::conversation::Conversation;
use crate::errors::{AgentError, AgentResult};
use crate::extract::extract;
use crate::guard::{guard, Interrupted};
use crate::models::message::Turn;
use crate::models::tool::ToolCall;
use crate::observer::{Observer, TraceEvent, TracingObserver};
use crate::providers::base::Provider;
use crate::schema::{instruction_prompt, ErrorCode, ParsedOutcome, Schema, ValidationError};
use crate::tools::{parse_tool_call, Tool, ToolError, ToolRegistry};

/// Knobs of the generation loop, fixed for the lifetime of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Fail with `MaxRetriesExceeded` instead of returning an unvalidated answer
    pub strict: bool,
    /// Corrective round trips allowed after the first invalid answer
    pub max_retries: usize,
    pub debug: bool,
    /// Tool dispatches allowed in one plain generation
    pub max_tool_calls: usize,
    /// Iteration cap of the reasoning strategy
    pub max_iterations: usize,
    /// Deadline for each backend call and each tool execution
    pub call_timeout: Option<Duration>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            strict: true,
            max_retries: 2,
            debug: false,
            max_tool_calls: 8,
            max_iterations: 5,
            call_timeout: None,
        }
    }
}

/// The answer of one generation call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generation {
    /// Canonical JSON when validated, the backend's raw reply otherwise
    pub content: String,
    /// Parsed value, set when a schema applied and a candidate was found
    pub value: Option<Value>,
    pub validated: bool,
    pub backend_calls: usize,
}

impl Generation {
    pub(crate) fn validated(value: Value, backend_calls: usize) -> Self {
        Self {
            content: value.to_string(),
            value: Some(value),
            validated: true,
            backend_calls,
        }
    }
}

pub struct AgentBuilder {
    provider: Box<dyn Provider>,
    system_prompt: Option<String>,
    tools: Vec<Box<dyn Tool>>,
    schema: Option<Schema>,
    config: GenerationConfig,
    observer: Option<Arc<dyn Observer>>,
}

impl AgentBuilder {
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self {
            provider,
            system_prompt: None,
            tools: Vec::new(),
            schema: None,
            config: GenerationConfig::default(),
            observer: None,
        }
    }

    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Box::new(tool));
        self
    }

    /// Every plain generation of the built agent is validated against this schema
    pub fn with_output_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Register the tools and fold the tool catalogue and schema instructions into the system turn
    pub fn build(self) -> AgentResult<Agent> {
        let mut tools = ToolRegistry::new();
        for tool in self.tools {
            tools.register(tool)?;
        }

        let mut sections = Vec::new();
        if let Some(prompt) = self.system_prompt {
            sections.push(prompt);
        }
        if !tools.is_empty() {
            sections.push(tools.describe().map_err(prompt_error)?);
        }
        if let Some(schema) = &self.schema {
            sections.push(render_instructions(schema)?);
        }
        let system = (!sections.is_empty()).then(|| sections.join("\n\n"));

        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(TracingObserver::new(self.config.debug)));

        Ok(Agent {
            provider: self.provider,
            tools,
            schema: self.schema.map(Arc::new),
            config: self.config,
            observer,
            conversation: Conversation::with_system(system),
        })
    }
}

/// Agent drives a backend through the schema-constrained generation loop
pub struct Agent {
    provider: Box<dyn Provider>,
    tools: ToolRegistry,
    schema: Option<Arc<Schema>>,
    config: GenerationConfig,
    observer: Arc<dyn Observer>,
    conversation: Conversation,
}

impl Agent {
    pub fn builder(provider: Box<dyn Provider>) -> AgentBuilder {
        AgentBuilder::new(provider)
    }

    /// Generate a reply, validated against the agent's schema when one is set
    pub async fn generate(&mut self, input: &str) -> AgentResult<Generation> {
        self.generate_with(input, None, &CancellationToken::new()).await
    }

    /// Generate a reply validated against `schema` instead of the agent's own
    pub async fn generate_with_schema(
        &mut self,
        input: &str,
        schema: &Schema,
    ) -> AgentResult<Generation> {
        self.generate_with(input, Some(schema), &CancellationToken::new()).await
    }

    /// Generate a reply, aborting with `AgentError::Cancelled` once `cancel` fires
    pub async fn generate_with(
        &mut self,
        input: &str,
        schema: Option<&Schema>,
        cancel: &CancellationToken,
    ) -> AgentResult<Generation> {
        let (schema, instructions) = match schema {
            Some(schema) => {
                let instructions = render_instructions(schema)?;
                self.push(Turn::user(format!("{input}\n\n{instructions}")));
                (Some(Arc::new(schema.clone())), Some(instructions))
            }
            None => {
                self.push(Turn::user(input));
                let instructions = match &self.schema {
                    Some(schema) => Some(render_instructions(schema)?),
                    None => None,
                };
                (self.schema.clone(), instructions)
            }
        };

        let mut backend_calls = 0;
        let mut tool_calls = 0;
        let mut retries = 0;
        loop {
            let reply = self.send(cancel).await?;
            backend_calls += 1;

            let errors = match (parse_tool_call(&reply), &schema) {
                (Ok(Some(call)), _) => {
                    if tool_calls >= self.config.max_tool_calls {
                        return Err(AgentError::ToolCallLimitExceeded(self.config.max_tool_calls));
                    }
                    tool_calls += 1;
                    self.push(Turn::assistant(reply));
                    let output = self.run_tool(&call, cancel).await?;
                    self.push(Turn::tool(
                        call.name.clone(),
                        format!("TOOL RESULT [{}]: {}", call.name, output),
                    ));
                    continue;
                }
                // Without a schema, anything but a well-formed tool call is the answer
                (Ok(None) | Err(_), None) => {
                    self.push(Turn::assistant(reply.clone()));
                    return Ok(Generation {
                        content: reply,
                        value: None,
                        validated: false,
                        backend_calls,
                    });
                }
                (Err(err), Some(_)) => vec![ValidationError::new(
                    "",
                    err.to_string(),
                    ErrorCode::MalformedToolCall,
                )],
                (Ok(None), Some(schema)) => match self.check(schema, &reply) {
                    Ok(value) => {
                        let generation = Generation::validated(value, backend_calls);
                        self.push(Turn::assistant(generation.content.clone()));
                        return Ok(generation);
                    }
                    Err(errors) => errors,
                },
            };

            self.push(Turn::assistant(reply.clone()));
            if retries >= self.config.max_retries {
                if self.config.strict {
                    return Err(AgentError::MaxRetriesExceeded {
                        attempts: retries + 1,
                        errors,
                    });
                }
                return Ok(Generation {
                    value: extract(&reply),
                    content: reply,
                    validated: false,
                    backend_calls,
                });
            }
            retries += 1;
            self.observe(TraceEvent::RetryScheduled {
                attempt: retries,
                remaining: self.config.max_retries - retries,
            });
            self.push(Turn::user(retry_feedback(instructions.as_deref(), &errors)));
        }
    }

    /// Read-only view of the conversation so far
    pub fn history(&self) -> &[Turn] {
        self.conversation.turns()
    }

    pub fn snapshot(&self) -> Vec<Turn> {
        self.conversation.snapshot()
    }

    /// Forget everything but the initial system turn
    pub fn reset(&mut self) {
        self.conversation.reset();
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_deref()
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.conversation.push(turn);
    }

    pub(crate) fn observe(&self, event: TraceEvent<'_>) {
        self.observer.on_event(&event);
    }

    /// Send the whole conversation to the backend and return its reply
    pub(crate) async fn send(&self, cancel: &CancellationToken) -> AgentResult<String> {
        let turns = self.conversation.turns();
        self.observe(TraceEvent::RequestSent { turns: turns.len() });
        let response = match guard(self.provider.complete(turns), cancel, self.config.call_timeout)
            .await
        {
            Ok(response) => response?,
            Err(Interrupted::Cancelled) => return Err(AgentError::Cancelled),
            Err(Interrupted::TimedOut(after)) => return Err(AgentError::Timeout(after)),
        };
        self.observe(TraceEvent::ResponseReceived {
            content: &response.content,
        });
        Ok(response.content)
    }

    /// Dispatch a tool call. Lookup failures, cancellation and timeouts are fatal;
    /// anything else the tool does wrong is returned as observation text.
    pub(crate) async fn run_tool(
        &self,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> AgentResult<String> {
        self.observe(TraceEvent::ToolDispatched { name: &call.name });
        match self
            .tools
            .dispatch(call, cancel, self.config.call_timeout)
            .await
        {
            Ok(output) => Ok(output),
            Err(ToolError::NotFound(name)) => Err(AgentError::ToolNotFound(name)),
            Err(ToolError::Cancelled(_)) => Err(AgentError::Cancelled),
            Err(ToolError::Timeout { after, .. }) => Err(AgentError::Timeout(after)),
            Err(err) => {
                let message = err.to_string();
                self.observe(TraceEvent::ToolFailed {
                    name: &call.name,
                    error: &message,
                });
                Ok(format!("Tool error: {message}"))
            }
        }
    }

    /// Extract a candidate from `reply` and validate it
    pub(crate) fn check(&self, schema: &Schema, reply: &str) -> Result<Value, Vec<ValidationError>> {
        let candidate = extract(reply);
        self.observe(TraceEvent::CandidateExtracted {
            found: candidate.is_some(),
        });
        let outcome = match &candidate {
            Some(candidate) => schema.validate(candidate),
            None => ParsedOutcome::Failure(vec![ValidationError::no_candidate()]),
        };
        match outcome {
            ParsedOutcome::Success(value) => {
                self.observe(TraceEvent::ValidationSucceeded);
                Ok(value)
            }
            ParsedOutcome::Failure(errors) => {
                self.observe(TraceEvent::ValidationFailed { errors: &errors });
                Err(errors)
            }
        }
    }
}

pub(crate) fn render_instructions(schema: &Schema) -> AgentResult<String> {
    instruction_prompt(schema).map_err(prompt_error)
}

pub(crate) fn prompt_error(err: tera::Error) -> AgentError {
    AgentError::Prompt(err.to_string())
}

/// Corrective turn: the instruction prompt followed by one `- <error>` line per violation
pub(crate) fn retry_feedback(instructions: Option<&str>, errors: &[ValidationError]) -> String {
    let mut lines = Vec::new();
    if let Some(instructions) = instructions {
        lines.push(instructions.to_string());
    }
    lines.push("Previous attempt failed due to:".to_string());
    lines.extend(errors.iter().map(|e| format!("- {e}")));
    lines.push("Please correct these issues and reply with the corrected JSON object.".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::models::role::Role;
    use crate::observer::tests::RecordingObserver;
    use crate::providers::mock::{MockProvider, MockReply};
    use crate::schema::SchemaType;
    use crate::tools::FunctionTool;
    use serde_json::{json, Map};
    use std::sync::atomic::Ordering;

    fn person() -> Schema {
        Schema::new(
            "Person",
            SchemaType::object()
                .field("name", SchemaType::string())
                .field("age", SchemaType::number().range(0.0, 150.0)),
        )
        .unwrap()
    }

    fn weather() -> FunctionTool {
        FunctionTool::new(
            "get_weather",
            "Current weather for a city",
            SchemaType::object().field("location", SchemaType::string()),
            |args: Map<String, Value>| async move {
                let location = args["location"].as_str().unwrap_or_default().to_string();
                Ok(format!("Sunny in {location}"))
            },
        )
    }

    #[tokio::test]
    async fn test_plain_response() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec!["Hello!"]);
        let mut agent = Agent::builder(Box::new(provider)).build()?;

        let generation = agent.generate("Hi").await?;
        assert_eq!(generation.content, "Hello!");
        assert_eq!(generation.value, None);
        assert!(!generation.validated);
        assert_eq!(generation.backend_calls, 1);
        assert_eq!(
            agent.history(),
            &[Turn::user("Hi"), Turn::assistant("Hello!")]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_strict_fails_after_three_calls() -> anyhow::Result<()> {
        let provider = MockProvider::repeating("I am not sure.");
        let calls = provider.calls();
        let mut agent = Agent::builder(Box::new(provider))
            .with_output_schema(person())
            .build()?;

        let err = agent.generate("Describe Ann").await.unwrap_err();
        match err {
            AgentError::MaxRetriesExceeded { attempts, errors } => {
                assert_eq!(attempts, 3);
                assert_eq!(errors[0].code, ErrorCode::NoCandidate);
            }
            other => panic!("Expected MaxRetriesExceeded, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_lenient_returns_last_candidate() -> anyhow::Result<()> {
        let provider = MockProvider::repeating(r#"{"name": "Ann", "age": 200}"#);
        let calls = provider.calls();
        let mut agent = Agent::builder(Box::new(provider))
            .with_output_schema(person())
            .with_config(GenerationConfig {
                strict: false,
                ..Default::default()
            })
            .build()?;

        let generation = agent.generate("Describe Ann").await?;
        assert!(!generation.validated);
        assert_eq!(generation.content, r#"{"name": "Ann", "age": 200}"#);
        assert_eq!(generation.value, Some(json!({"name": "Ann", "age": 200})));
        assert_eq!(generation.backend_calls, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_corrects_out_of_range_age() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec![
            r#"Final Answer: {"name":"Ann","age":200}"#,
            r#"{"name":"Ann","age":30}"#,
        ]);
        let calls = provider.calls();
        let requests = provider.requests();
        let mut agent = Agent::builder(Box::new(provider))
            .with_output_schema(person())
            .build()?;

        let generation = agent.generate("Describe Ann").await?;
        assert!(generation.validated);
        assert_eq!(generation.value, Some(json!({"name": "Ann", "age": 30})));
        assert_eq!(generation.backend_calls, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let requests = requests.lock().unwrap();
        let feedback = requests[1].last().unwrap();
        assert_eq!(feedback.role, Role::User);
        assert!(feedback.content.contains("Previous attempt failed due to:"));
        assert!(feedback
            .content
            .contains("- `age` must be at most 150, got 200 (out_of_range)"));
        assert!(feedback.content.contains("\"Person\" schema"));

        let last = agent.history().last().unwrap();
        assert_eq!(last, &Turn::assistant(r#"{"name":"Ann","age":30}"#));
        Ok(())
    }

    #[tokio::test]
    async fn test_system_turn_folds_tools_and_schema() -> anyhow::Result<()> {
        let agent = Agent::builder(Box::new(MockProvider::new(Vec::<String>::new())))
            .with_system_prompt("You extract people.")
            .with_tool(weather())
            .with_output_schema(person())
            .build()?;

        let system = &agent.history()[0];
        assert_eq!(system.role, Role::System);
        assert!(system.content.starts_with("You extract people."));
        assert!(system.content.contains("Tool Name: get_weather"));
        assert!(system.content.contains("\"age\": number (between 0 and 150)"));
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_call_round_trip() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec![
            r#"toolCall: get_weather({"location": "Oslo"})"#,
            "It is sunny in Oslo.",
        ]);
        let mut agent = Agent::builder(Box::new(provider))
            .with_tool(weather())
            .build()?;

        let generation = agent.generate("Weather in Oslo?").await?;
        assert_eq!(generation.content, "It is sunny in Oslo.");
        assert_eq!(generation.backend_calls, 2);

        let history = agent.history();
        assert_eq!(
            history[3],
            Turn::tool("get_weather", "TOOL RESULT [get_weather]: Sunny in Oslo")
        );
        assert_eq!(history.len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_calls_do_not_consume_retries() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec![
            r#"toolCall: get_weather({"location": "Oslo"})"#,
            r#"toolCall: get_weather({"location": "Bergen"})"#,
            r#"toolCall: get_weather({"location": "Tromsø"})"#,
            r#"{"name": "Ann", "age": 30}"#,
        ]);
        let mut agent = Agent::builder(Box::new(provider))
            .with_tool(weather())
            .with_output_schema(person())
            .with_config(GenerationConfig {
                max_retries: 0,
                ..Default::default()
            })
            .build()?;

        let generation = agent.generate("Describe Ann").await?;
        assert!(generation.validated);
        assert_eq!(generation.backend_calls, 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tool_is_fatal() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec![r#"toolCall: search({"q": "rust"})"#]);
        let mut agent = Agent::builder(Box::new(provider))
            .with_tool(weather())
            .build()?;

        let err = agent.generate("Search").await.unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(name) if name == "search"));
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_failure_becomes_observation() -> anyhow::Result<()> {
        let broken = FunctionTool::new("broken", "Always fails", SchemaType::object(), |_| async {
            Err(anyhow::anyhow!("disk full"))
        });
        let provider = MockProvider::new(vec!["toolCall: broken({})", "Sorry, it failed."]);
        let requests = provider.requests();
        let mut agent = Agent::builder(Box::new(provider)).with_tool(broken).build()?;

        let generation = agent.generate("Try it").await?;
        assert_eq!(generation.content, "Sorry, it failed.");

        let requests = requests.lock().unwrap();
        assert_eq!(
            requests[1].last().unwrap().content,
            "TOOL RESULT [broken]: Tool error: Tool broken failed: disk full"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_call_limit() -> anyhow::Result<()> {
        let provider = MockProvider::repeating(r#"toolCall: get_weather({"location": "Oslo"})"#);
        let calls = provider.calls();
        let mut agent = Agent::builder(Box::new(provider))
            .with_tool(weather())
            .with_config(GenerationConfig {
                max_tool_calls: 2,
                ..Default::default()
            })
            .build()?;

        let err = agent.generate("Loop forever").await.unwrap_err();
        assert!(matches!(err, AgentError::ToolCallLimitExceeded(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_tool_call_consumes_retry() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec![
            "toolCall: get_weather(Oslo)",
            r#"{"name": "Ann", "age": 30}"#,
        ]);
        let requests = provider.requests();
        let mut agent = Agent::builder(Box::new(provider))
            .with_tool(weather())
            .with_output_schema(person())
            .build()?;

        let generation = agent.generate("Describe Ann").await?;
        assert!(generation.validated);
        assert_eq!(generation.backend_calls, 2);

        let requests = requests.lock().unwrap();
        assert!(requests[1]
            .last()
            .unwrap()
            .content
            .contains("(malformed_tool_call)"));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_tool_call_without_schema_is_returned_verbatim() -> anyhow::Result<()> {
        let reply = "You could try toolCall: search() next time.";
        let provider = MockProvider::repeating(reply);
        let calls = provider.calls();
        let mut agent = Agent::builder(Box::new(provider)).build()?;

        let generation = agent.generate("Hi").await?;
        assert_eq!(generation.content, reply);
        assert_eq!(generation.value, None);
        assert!(!generation.validated);
        assert_eq!(generation.backend_calls, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let last = agent.history().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, reply);
        assert_eq!(agent.history().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() -> anyhow::Result<()> {
        let provider = MockProvider::scripted(vec![MockReply::Error(
            ProviderError::InvalidResponse("empty body".to_string()),
        )]);
        let calls = provider.calls();
        let mut agent = Agent::builder(Box::new(provider))
            .with_output_schema(person())
            .build()?;

        let err = agent.generate("Describe Ann").await.unwrap_err();
        assert!(matches!(err, AgentError::Transport(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_before_sending() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec!["Hello!"]);
        let calls = provider.calls();
        let mut agent = Agent::builder(Box::new(provider)).build()?;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = agent.generate_with("Hi", None, &cancel).await.unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_backend_timeout() -> anyhow::Result<()> {
        let provider = MockProvider::scripted(vec![MockReply::Delayed(
            Duration::from_secs(30),
            "too late".to_string(),
        )]);
        let mut agent = Agent::builder(Box::new(provider))
            .with_config(GenerationConfig {
                call_timeout: Some(Duration::from_millis(10)),
                ..Default::default()
            })
            .build()?;

        let err = agent.generate("Hi").await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout(after) if after == Duration::from_millis(10)));
        Ok(())
    }

    #[tokio::test]
    async fn test_schema_override() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec![r#"{"name": "Ann", "age": 30}"#]);
        let mut agent = Agent::builder(Box::new(provider)).build()?;

        let generation = agent.generate_with_schema("Describe Ann", &person()).await?;
        assert!(generation.validated);
        assert!(agent.history()[0].content.starts_with("Describe Ann\n\n"));
        assert!(agent.history()[0].content.contains("JSON Output:"));
        assert!(agent.schema().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_keeps_system_turn() -> anyhow::Result<()> {
        let provider = MockProvider::new(vec!["Hello!"]);
        let mut agent = Agent::builder(Box::new(provider))
            .with_system_prompt("Be brief.")
            .build()?;

        agent.generate("Hi").await?;
        let snapshot = agent.snapshot();
        assert_eq!(snapshot.len(), 3);

        agent.reset();
        assert_eq!(agent.history(), &[Turn::system("Be brief.")]);
        assert_eq!(snapshot.len(), 3);
        Ok(())
    }

    #[test]
    fn test_duplicate_tool_rejected() {
        let result = Agent::builder(Box::new(MockProvider::new(Vec::<String>::new())))
            .with_tool(weather())
            .with_tool(weather())
            .build();
        assert!(matches!(result, Err(AgentError::DuplicateTool(name)) if name == "get_weather"));
    }

    #[tokio::test]
    async fn test_observer_sees_trace_points() -> anyhow::Result<()> {
        let observer = Arc::new(RecordingObserver::default());
        let provider = MockProvider::new(vec![
            r#"toolCall: get_weather({"location": "Oslo"})"#,
            "not json",
            r#"{"name": "Ann", "age": 30}"#,
        ]);
        let mut agent = Agent::builder(Box::new(provider))
            .with_tool(weather())
            .with_output_schema(person())
            .with_observer(observer.clone())
            .build()?;

        agent.generate("Describe Ann").await?;
        let events = observer.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                "request",
                "response",
                "tool:get_weather",
                "request",
                "response",
                "candidate:false",
                "invalid:1",
                "retry:1",
                "request",
                "response",
                "candidate:true",
                "valid",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: GenerationConfig =
            serde_json::from_value(json!({"strict": false, "max_retries": 4})).unwrap();
        assert!(!config.strict);
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.max_tool_calls, 8);
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.call_timeout, None);
    }
}
