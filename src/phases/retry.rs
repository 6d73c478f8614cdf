//! Bounded verify-and-fix loop used by the Test phase.
//!
//! The verifier runs at most `bound + 1` times. Between failing runs the
//! agent is asked for a fix with the failing output; an agent error is
//! logged and the verifier runs again anyway, since a partial fix may
//! already be on disk.

use tracing::{info, warn};

use crate::agent::Agent;
use crate::errors::PhaseError;
use crate::verify::Verifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome {
    pub success: bool,
    /// Verifier runs performed, 1..=bound+1
    pub attempts: u32,
    /// Output of the last verifier run
    pub output: String,
}

pub struct RetryController<'a> {
    verifier: &'a dyn Verifier,
    agent: &'a dyn Agent,
    bound: u32,
}

impl<'a> RetryController<'a> {
    /// `bound` is the number of extra verifier runs after the first.
    pub fn new(verifier: &'a dyn Verifier, agent: &'a dyn Agent, bound: u32) -> Self {
        Self {
            verifier,
            agent,
            bound,
        }
    }

    /// Run the loop. `fix_prompt(attempt, output)` renders the prompt for the
    /// fix preceding verifier run `attempt`.
    pub async fn run<F>(&self, mut fix_prompt: F) -> Result<RetryOutcome, PhaseError>
    where
        F: FnMut(u32, &str) -> Result<String, PhaseError>,
    {
        let max_attempts = self.bound + 1;
        let mut attempt = 1;
        loop {
            let run = self.verifier.test().await;
            if run.is_passed() {
                info!(attempt, "Tests passed");
                return Ok(RetryOutcome {
                    success: true,
                    attempts: attempt,
                    output: run.output,
                });
            }
            if attempt >= max_attempts {
                warn!(attempts = attempt, "Tests failed, retries exhausted");
                return Ok(RetryOutcome {
                    success: false,
                    attempts: attempt,
                    output: run.output,
                });
            }

            warn!(attempt, max = max_attempts, "Tests failed");
            let next = attempt + 1;
            let prompt = fix_prompt(next, &run.output)?;
            if let Err(e) = self.agent.generate(&prompt).await {
                warn!(attempt = next, error = %e, "Fix invocation failed, re-running tests anyway");
            }
            attempt = next;
        }
    }
}
