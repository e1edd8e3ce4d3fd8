//! Trace points of a generation, reported to an injected [`Observer`].
use crate::schema::ValidationError;

/// Something notable that happened while producing one generation
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent<'a> {
    RequestSent { turns: usize },
    ResponseReceived { content: &'a str },
    ToolDispatched { name: &'a str },
    ToolFailed { name: &'a str, error: &'a str },
    CandidateExtracted { found: bool },
    ValidationSucceeded,
    ValidationFailed { errors: &'a [ValidationError] },
    RetryScheduled { attempt: usize, remaining: usize },
    ReactStep { iteration: usize, section: &'a str },
}

/// Receives trace events from an agent. Implementations must not block.
pub trait Observer: Send + Sync {
    fn on_event(&self, event: &TraceEvent<'_>);
}

/// Default observer, logging every event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver {
    verbose: bool,
}

impl TracingObserver {
    /// With `verbose` set, events are logged at `info` instead of `debug`
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

macro_rules! trace_at {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

impl Observer for TracingObserver {
    fn on_event(&self, event: &TraceEvent<'_>) {
        match event {
            TraceEvent::RequestSent { turns } => {
                trace_at!(self.verbose, turns, "request sent")
            }
            TraceEvent::ResponseReceived { content } => {
                trace_at!(self.verbose, chars = content.len(), "response received: {}", content)
            }
            TraceEvent::ToolDispatched { name } => {
                trace_at!(self.verbose, tool = %name, "tool dispatched")
            }
            TraceEvent::ToolFailed { name, error } => {
                tracing::warn!(tool = %name, "tool failed: {}", error)
            }
            TraceEvent::CandidateExtracted { found } => {
                trace_at!(self.verbose, found, "candidate extracted")
            }
            TraceEvent::ValidationSucceeded => trace_at!(self.verbose, "validation succeeded"),
            TraceEvent::ValidationFailed { errors } => {
                let summary: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                trace_at!(
                    self.verbose,
                    count = errors.len(),
                    "validation failed: {}",
                    summary.join("; ")
                )
            }
            TraceEvent::RetryScheduled { attempt, remaining } => {
                trace_at!(self.verbose, attempt, remaining, "retry scheduled")
            }
            TraceEvent::ReactStep { iteration, section } => {
                trace_at!(self.verbose, iteration, section = %section, "react step")
            }
        }
    }
}
