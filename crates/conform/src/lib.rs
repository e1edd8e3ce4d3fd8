pub mod agent;
pub mod conversation;
pub mod errors;
pub mod extract;
mod guard;
pub mod models;
pub mod observer;
pub mod prompt_template;
pub mod providers;
pub mod schema;
pub mod strategies;
pub mod tools;

pub use agent::{Agent, AgentBuilder, Generation, GenerationConfig};
pub use errors::{AgentError, AgentResult, ProviderError};
pub use models::message::Turn;
pub use models::role::Role;
pub use observer::{Observer, TraceEvent, TracingObserver};
pub use schema::{ErrorCode, Field, ParsedOutcome, Schema, SchemaType, ValidationError};
pub use strategies::{ReactStrategy, Strategy};
pub use tokio_util::sync::CancellationToken;
pub use tools::{FunctionTool, Tool, ToolRegistry};
