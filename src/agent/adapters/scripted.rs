//! Deterministic capability handler for tests and local orchestration runs.

use crate::agent::{
    domain::{AgentDomainError, AgentIdentity, Capability},
    ports::{AgentError, AgentResult, CapabilityHandler},
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Scripted behaviour for one capability.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    outcome: ScriptOutcome,
    delay: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
enum ScriptOutcome {
    Reply(Value),
    Echo,
    Fail(AgentError),
    #[cfg(test)]
    Panic(String),
}

impl Script {
    /// Answers every request with `result`.
    #[must_use]
    pub const fn reply(result: Value) -> Self {
        Self {
            outcome: ScriptOutcome::Reply(result),
            delay: None,
        }
    }

    /// Answers every request with its own parameters.
    #[must_use]
    pub const fn echo() -> Self {
        Self {
            outcome: ScriptOutcome::Echo,
            delay: None,
        }
    }

    /// Fails every request with a generic retryable error.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self::fail_with(AgentError::failed(message))
    }

    /// Fails every request with `error`.
    #[must_use]
    pub const fn fail_with(error: AgentError) -> Self {
        Self {
            outcome: ScriptOutcome::Fail(error),
            delay: None,
        }
    }

    /// Panics inside the handler.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn panic(message: impl Into<String>) -> Self {
        Self {
            outcome: ScriptOutcome::Panic(message.into()),
            delay: None,
        }
    }

    /// Sleeps for `delay` before producing the outcome.
    #[must_use]
    pub const fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Capability handler driven by per-capability [`Script`]s.
///
/// Declared capabilities without a script echo their parameters. Every
/// invocation is recorded so tests can assert on what was called.
#[derive(Debug)]
pub struct ScriptedAgent {
    identity: AgentIdentity,
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedAgent {
    /// Creates a scripted handler for `identity`.
    #[must_use]
    pub fn new(identity: AgentIdentity) -> Self {
        Self {
            identity,
            scripts: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a handler named `name` declaring `capabilities`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDomainError`] when the name or a capability name is
    /// invalid or a capability is repeated.
    pub fn with_capabilities(name: &str, capabilities: &[&str]) -> Result<Self, AgentDomainError> {
        let mut identity = AgentIdentity::new(name, "1.0.0")?;
        for capability in capabilities {
            identity = identity.with_capability(Capability::new(*capability, *capability)?)?;
        }
        Ok(Self::new(identity))
    }

    /// Sets the script for `capability`.
    #[must_use]
    pub fn on(mut self, capability: impl Into<String>, script: Script) -> Self {
        self.scripts.insert(capability.into(), script);
        self
    }

    /// Returns every `(capability, parameters)` pair received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns how many times `capability` was invoked.
    #[must_use]
    pub fn call_count(&self, capability: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(name, _)| name == capability)
            .count()
    }
}

#[async_trait]
impl CapabilityHandler for ScriptedAgent {
    fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    async fn execute(&self, capability: &str, parameters: Value) -> AgentResult<Value> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((capability.to_owned(), parameters.clone()));

        let script = self
            .scripts
            .get(capability)
            .cloned()
            .unwrap_or_else(Script::echo);
        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }

        match script.outcome {
            ScriptOutcome::Reply(result) => Ok(result),
            ScriptOutcome::Echo => Ok(parameters),
            ScriptOutcome::Fail(error) => Err(error),
            #[cfg(test)]
            ScriptOutcome::Panic(message) => scripted_panic(&message),
        }
    }
}

#[cfg(test)]
fn scripted_panic(message: &str) -> ! {
    panic!("{message}")
}
