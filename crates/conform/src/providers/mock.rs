use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::models::message::Turn;
use crate::providers::base::{Provider, ProviderResponse};

/// One scripted reply of a [`MockProvider`]
pub enum MockReply {
    Text(String),
    Error(ProviderError),
    /// Sleep before answering, for timeout and cancellation tests
    Delayed(Duration, String),
}

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    replies: Mutex<Vec<MockReply>>,
    /// Replayed once the script is exhausted
    fallback: Option<String>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<Vec<Turn>>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of text responses
    pub fn new<S: Into<String>>(responses: Vec<S>) -> Self {
        Self::scripted(responses.into_iter().map(|r| MockReply::Text(r.into())).collect())
    }

    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies),
            fallback: None,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A provider that gives the same answer forever
    pub fn repeating<S: Into<String>>(response: S) -> Self {
        let mut provider = Self::scripted(Vec::new());
        provider.fallback = Some(response.into());
        provider
    }

    /// Shared counter of `complete` calls, readable after the provider moved into an agent
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Shared record of the conversation sent with each call
    pub fn requests(&self) -> Arc<Mutex<Vec<Vec<Turn>>>> {
        Arc::clone(&self.seen)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, turns: &[Turn]) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(turns.to_vec());

        let next = {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                None
            } else {
                Some(replies.remove(0))
            }
        };

        match next {
            Some(MockReply::Text(text)) => Ok(ProviderResponse::new(text, None)),
            Some(MockReply::Error(err)) => Err(err),
            Some(MockReply::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(ProviderResponse::new(text, None))
            }
            // Return empty response if no more pre-configured responses
            None => Ok(ProviderResponse::new(
                self.fallback.clone().unwrap_or_default(),
                None,
            )),
        }
    }
}
