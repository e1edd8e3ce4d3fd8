//! Alternative protocols layered on top of an [`Agent`](crate::Agent).
mod react;

pub use react::{parse_sections, ReactSections, ReactStrategy};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, Generation};
use crate::errors::AgentResult;
use crate::schema::Schema;

/// A way of driving an agent's conversation to a final answer
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Run the strategy for `input`. A `schema` here overrides the agent's own.
    async fn execute(
        &self,
        agent: &mut Agent,
        input: &str,
        schema: Option<&Schema>,
        cancel: &CancellationToken,
    ) -> AgentResult<Generation>;
}
