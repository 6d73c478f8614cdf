//! Code-generation agent seam.
//!
//! An agent turns a rendered prompt into text. It may also edit the
//! workspace while it runs; those edits are not part of the return value
//! and are picked up later by the verifier and the commit phase.

pub mod claude;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::AgentError;

pub use claude::ClaudeCli;

/// A black-box text generator.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError>;
}

#[async_trait]
impl<T: Agent + ?Sized> Agent for Arc<T> {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        (**self).generate(prompt).await
    }
}

/// Wraps an agent with a bounded number of attempts per invocation.
pub struct RetryingAgent<A> {
    inner: A,
    attempts: u32,
}

impl<A: Agent> RetryingAgent<A> {
    /// `attempts` is the total number of tries; zero is treated as one.
    pub fn new(inner: A, attempts: u32) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[async_trait]
impl<A: Agent> Agent for RetryingAgent<A> {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        let mut last = String::new();
        for attempt in 1..=self.attempts {
            match self.inner.generate(prompt).await {
                Ok(text) => {
                    if attempt > 1 {
                        info!(attempt, "Agent succeeded after retry");
                    }
                    return Ok(text);
                }
                Err(e) => {
                    warn!(attempt, max = self.attempts, error = %e, "Agent attempt failed");
                    last = e.to_string();
                }
            }
        }
        Err(AgentError::Exhausted {
            attempts: self.attempts,
            last,
        })
    }
}
