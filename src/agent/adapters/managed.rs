//! Status-tracking agent wrapper.

use crate::{
    agent::{
        domain::{AgentIdentity, AgentStatus},
        ports::{Agent, AgentError, AgentResult, CapabilityHandler},
    },
    clock::SharedClock,
    message::domain::Message,
};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Wraps a [`CapabilityHandler`] into a full [`Agent`].
///
/// Incoming messages must be requests for a declared capability; anything
/// else is answered with an `Error` message. Status moves to `Busy` while
/// at least one request is in flight, to `Error` after a failed request and
/// back to `Idle` once a request succeeds with nothing else in flight.
pub struct ManagedAgent<H> {
    handler: H,
    clock: SharedClock,
    state: Mutex<ManagedState>,
}

#[derive(Debug, Default)]
struct ManagedState {
    status: AgentStatus,
    in_flight: usize,
}

impl<H: CapabilityHandler> ManagedAgent<H> {
    /// Wraps `handler`.
    #[must_use]
    pub fn new(handler: H, clock: SharedClock) -> Self {
        Self {
            handler,
            clock,
            state: Mutex::new(ManagedState::default()),
        }
    }

    /// Returns the wrapped handler.
    #[must_use]
    pub const fn handler(&self) -> &H {
        &self.handler
    }

    fn state(&self) -> MutexGuard<'_, ManagedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn validate(&self, message: &Message) -> AgentResult<()> {
        let identity = self.handler.identity();
        if self.state().status == AgentStatus::Offline {
            return Err(AgentError::Offline(identity.name().to_string()));
        }
        let Some((capability, _)) = message.as_request() else {
            return Err(AgentError::UnexpectedMessageType {
                agent: identity.name().to_string(),
                received: message.message_type(),
            });
        };
        if !identity.supports(capability) {
            return Err(AgentError::UnsupportedCapability {
                agent: identity.name().to_string(),
                capability: capability.to_owned(),
            });
        }
        Ok(())
    }
}

/// Releases the in-flight slot even when the handler panics.
struct BusyGuard<'a> {
    state: &'a Mutex<ManagedState>,
    failed: bool,
}

impl<'a> BusyGuard<'a> {
    fn enter(state: &'a Mutex<ManagedState>) -> Self {
        let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
        guard.in_flight = guard.in_flight.saturating_add(1);
        guard.status = AgentStatus::Busy;
        Self {
            state,
            failed: true,
        }
    }

    const fn succeed(&mut self) {
        self.failed = false;
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        guard.in_flight = guard.in_flight.saturating_sub(1);
        if guard.status == AgentStatus::Offline {
            return;
        }
        guard.status = if self.failed {
            AgentStatus::Error
        } else if guard.in_flight == 0 {
            AgentStatus::Idle
        } else {
            AgentStatus::Busy
        };
    }
}

#[async_trait]
impl<H: CapabilityHandler> Agent for ManagedAgent<H> {
    fn identity(&self) -> &AgentIdentity {
        self.handler.identity()
    }

    fn status(&self) -> AgentStatus {
        self.state().status
    }

    async fn initialize(&self) -> AgentResult<()> {
        self.handler.initialize().await?;
        self.state().status = AgentStatus::Idle;
        Ok(())
    }

    async fn shutdown(&self) -> AgentResult<()> {
        self.state().status = AgentStatus::Offline;
        self.handler.shutdown().await
    }

    async fn handle(&self, message: Message) -> AgentResult<Message> {
        if let Err(err) = self.validate(&message) {
            return Ok(message.reply_error(err.to_payload(), &*self.clock));
        }
        let Some((capability, parameters)) = message.as_request() else {
            return Err(AgentError::UnexpectedMessageType {
                agent: self.handler.identity().name().to_string(),
                received: message.message_type(),
            });
        };

        let mut busy = BusyGuard::enter(&self.state);
        let outcome = self
            .handler
            .execute(capability, parameters.clone())
            .await;
        match outcome {
            Ok(result) => {
                busy.succeed();
                drop(busy);
                Ok(message.reply(result, &*self.clock))
            }
            Err(err) => {
                drop(busy);
                Ok(message.reply_error(err.to_payload(), &*self.clock))
            }
        }
    }
}
