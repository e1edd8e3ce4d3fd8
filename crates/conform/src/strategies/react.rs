use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::Strategy;
use crate::agent::{prompt_error, render_instructions, retry_feedback, Agent, Generation};
use crate::errors::{AgentError, AgentResult};
use crate::models::message::Turn;
use crate::observer::TraceEvent;
use crate::prompt_template::load_prompt;
use crate::schema::Schema;
use crate::tools::parse_tool_call;

const REACT_TEMPLATE: &str = include_str!("../prompts/react.md");
const CONVERSION_TEMPLATE: &str = include_str!("../prompts/conversion.md");

const NUDGE: &str = "Your response contained neither an Action nor a Final Answer. \
Continue with an Action, or conclude with a Final Answer.";

lazy_static! {
    static ref SECTION: Regex =
        Regex::new(r"(?m)(?:^|[.!?])[ \t]*(Thought|Action|Observation|Final Answer)[ \t]*:")
            .unwrap();
}

/// The labeled sections of one ReAct reply. Each holds the text up to the next label.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReactSections {
    pub thought: Option<String>,
    pub action: Option<String>,
    pub final_answer: Option<String>,
}

/// Split a reply into its `Thought:`, `Action:` and `Final Answer:` sections.
///
/// Labels start a line or follow a sentence ending on the same line. The first occurrence of
/// each label wins and empty sections are treated as absent.
pub fn parse_sections(text: &str) -> ReactSections {
    // (label start, content start, label); the preceding section keeps its punctuation
    let labels: Vec<(usize, usize, &str)> = SECTION
        .captures_iter(text)
        .filter_map(|c| {
            let label = c.get(1)?;
            Some((label.start(), c.get(0)?.end(), label.as_str()))
        })
        .collect();

    let mut sections = ReactSections::default();
    for (i, (_, end, label)) in labels.iter().enumerate() {
        let stop = labels.get(i + 1).map_or(text.len(), |next| next.0);
        let content = text[*end..stop].trim();
        if content.is_empty() {
            continue;
        }
        let slot = match *label {
            "Thought" => &mut sections.thought,
            "Action" => &mut sections.action,
            "Final Answer" => &mut sections.final_answer,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(content.to_string());
        }
    }
    sections
}

/// Whether a final answer is raw tool output rather than a ready JSON object
fn looks_like_tool_output(answer: &str) -> bool {
    answer.contains("TOOL RESULT")
        || answer.contains("Observation:")
        || !answer.trim_start().starts_with('{')
}

#[derive(Serialize)]
struct ReactContext {
    has_tools: bool,
    has_schema: bool,
    tools: String,
    instructions: String,
}

enum Step {
    Done(Generation),
    /// Keep going; carries a description of what went wrong, if anything did
    Continue(Option<String>),
}

/// Thought / Action / Observation / Final Answer loop with a bounded iteration count.
///
/// Backend failures, malformed actions and unknown tools are fed back to the backend while
/// iterations remain. Cancellation always ends the run.
#[derive(Debug, Clone, Default)]
pub struct ReactStrategy {
    max_iterations: Option<usize>,
}

impl ReactStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the agent's `max_iterations`
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    fn system_prompt(agent: &Agent, instructions: Option<&str>) -> AgentResult<String> {
        let tools = if agent.tools().is_empty() {
            String::new()
        } else {
            agent.tools().describe().map_err(prompt_error)?
        };
        let context = ReactContext {
            has_tools: !agent.tools().is_empty(),
            has_schema: instructions.is_some(),
            tools,
            instructions: instructions.unwrap_or_default().to_string(),
        };
        load_prompt(REACT_TEMPLATE, &context).map_err(prompt_error)
    }

    async fn step(
        &self,
        agent: &mut Agent,
        iteration: usize,
        schema: Option<&Schema>,
        instructions: Option<&str>,
        cancel: &CancellationToken,
        backend_calls: &mut usize,
    ) -> AgentResult<Step> {
        let reply = agent.send(cancel).await?;
        *backend_calls += 1;
        let sections = parse_sections(&reply);

        if let Some(thought) = &sections.thought {
            agent.observe(TraceEvent::ReactStep {
                iteration,
                section: "thought",
            });
            tracing::trace!(iteration, "thought: {}", thought);
        }

        // A final answer wins over an action in the same reply
        if let Some(answer) = sections.final_answer {
            agent.observe(TraceEvent::ReactStep {
                iteration,
                section: "final_answer",
            });
            agent.push(Turn::assistant(reply));

            let (Some(schema), Some(instructions)) = (schema, instructions) else {
                return Ok(Step::Done(Generation {
                    content: answer,
                    value: None,
                    validated: false,
                    backend_calls: *backend_calls,
                }));
            };

            let answer = if looks_like_tool_output(&answer) {
                let converted = Self::convert(agent, &answer, instructions, cancel).await?;
                *backend_calls += 1;
                converted
            } else {
                answer
            };

            return match agent.check(schema, &answer) {
                Ok(value) => Ok(Step::Done(Generation::validated(value, *backend_calls))),
                Err(errors) => {
                    let summary = errors
                        .iter()
                        .map(|e| e.to_string())
                        .collect::<Vec<_>>()
                        .join("; ");
                    agent.push(Turn::user(retry_feedback(Some(instructions), &errors)));
                    Ok(Step::Continue(Some(summary)))
                }
            };
        }

        if let Some(action) = sections.action {
            agent.observe(TraceEvent::ReactStep {
                iteration,
                section: "action",
            });
            agent.push(Turn::assistant(reply));

            let call = match parse_tool_call(&action) {
                Ok(Some(call)) => call,
                Ok(None) => return Err(AgentError::InvalidAction(action)),
                Err(err) => return Err(AgentError::InvalidAction(err.to_string())),
            };
            let output = agent.run_tool(&call, cancel).await?;
            agent.push(Turn::tool(call.name.clone(), format!("Observation: {output}")));
            return Ok(Step::Continue(None));
        }

        agent.observe(TraceEvent::ReactStep {
            iteration,
            section: "none",
        });
        agent.push(Turn::assistant(reply));
        agent.push(Turn::user(NUDGE));
        Ok(Step::Continue(Some(
            "response had neither an Action nor a Final Answer".to_string(),
        )))
    }

    /// Ask the backend to turn raw tool output into schema-conforming JSON
    async fn convert(
        agent: &mut Agent,
        content: &str,
        instructions: &str,
        cancel: &CancellationToken,
    ) -> AgentResult<String> {
        let prompt = load_prompt(
            CONVERSION_TEMPLATE,
            &serde_json::json!({ "instructions": instructions, "content": content }),
        )
        .map_err(prompt_error)?;
        agent.push(Turn::user(prompt));
        let converted = agent.send(cancel).await?;
        agent.push(Turn::assistant(converted.clone()));
        Ok(converted)
    }
}

fn recovery_prompt(err: &AgentError, instructions: Option<&str>) -> String {
    let base = format!(
        "Error occurred during processing:\n{err}\nPlease correct your previous attempt."
    );
    match instructions {
        Some(instructions) => format!("{instructions}\n{base}"),
        None => base,
    }
}

#[async_trait]
impl Strategy for ReactStrategy {
    async fn execute(
        &self,
        agent: &mut Agent,
        input: &str,
        schema: Option<&Schema>,
        cancel: &CancellationToken,
    ) -> AgentResult<Generation> {
        let schema: Option<Schema> = schema.or(agent.schema()).cloned();
        let instructions = schema.as_ref().map(render_instructions).transpose()?;
        let max_iterations = self
            .max_iterations
            .unwrap_or(agent.config().max_iterations);

        let system = Self::system_prompt(agent, instructions.as_deref())?;
        agent.push(Turn::user(input));
        agent.push(Turn::system(system));

        let mut backend_calls = 0;
        let mut last_error = "no final answer was produced".to_string();
        for iteration in 1..=max_iterations {
            let result = self
                .step(
                    agent,
                    iteration,
                    schema.as_ref(),
                    instructions.as_deref(),
                    cancel,
                    &mut backend_calls,
                )
                .await;
            match result {
                Ok(Step::Done(generation)) => return Ok(generation),
                Ok(Step::Continue(problem)) => {
                    if let Some(problem) = problem {
                        last_error = problem;
                    }
                }
                Err(err @ (AgentError::Cancelled | AgentError::Prompt(_))) => return Err(err),
                Err(err) => {
                    tracing::debug!(iteration, "react step failed: {}", err);
                    if iteration < max_iterations {
                        agent.push(Turn::user(recovery_prompt(&err, instructions.as_deref())));
                    }
                    last_error = err.to_string();
                }
            }
        }

        Err(AgentError::MaxIterationsExceeded {
            iterations: max_iterations,
            last_error,
        })
    }
}
