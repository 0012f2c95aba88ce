//! Capability routing and request dispatch.

use crate::{
    agent::{
        domain::AgentName,
        ports::{Agent, AgentResult},
        services::AgentRegistry,
    },
    clock::SharedClock,
    message::domain::{ErrorPayload, Message, MessageBody, MessageId},
    metrics::CoordinatorMetrics,
    routing::domain::{DispatchError, DispatchRequest, DispatchResult, LoadBalanceStrategy},
};
use rand::Rng;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Routes requests to agents and records dispatch outcomes.
///
/// Agent handlers run on their own tokio task, so a panicking handler is
/// reported as a failed dispatch instead of unwinding into the caller, and
/// an elapsed deadline aborts the handler task.
pub struct MessageRouter {
    registry: Arc<AgentRegistry>,
    metrics: Arc<CoordinatorMetrics>,
    clock: SharedClock,
    round_robin: Mutex<HashMap<String, usize>>,
}

impl MessageRouter {
    /// Creates a router over `registry`.
    #[must_use]
    pub fn new(
        registry: Arc<AgentRegistry>,
        metrics: Arc<CoordinatorMetrics>,
        clock: SharedClock,
    ) -> Self {
        Self {
            registry,
            metrics,
            clock,
            round_robin: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the registry this router dispatches through.
    #[must_use]
    pub const fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Picks the agent that should handle `capability`.
    ///
    /// A single provider is returned directly; otherwise `strategy` decides.
    /// Returns `None` when no agent offers the capability.
    #[must_use]
    pub fn select_agent(
        &self,
        capability: &str,
        strategy: LoadBalanceStrategy,
    ) -> Option<AgentName> {
        match strategy {
            LoadBalanceStrategy::RoundRobin => {
                let providers = self.registry.find_agents(capability);
                if providers.len() <= 1 {
                    return providers.into_iter().next();
                }
                let slot = self.next_round_robin_slot(capability);
                slot.checked_rem(providers.len())
                    .and_then(|index| providers.get(index))
                    .cloned()
            }
            // `min_by_key` keeps the first minimum, i.e. the earliest registration.
            LoadBalanceStrategy::LeastLoaded => self
                .registry
                .provider_loads(capability)
                .into_iter()
                .min_by_key(|(_, load)| *load)
                .map(|(name, _)| name),
            LoadBalanceStrategy::Random => {
                let providers = self.registry.find_agents(capability);
                if providers.len() <= 1 {
                    return providers.into_iter().next();
                }
                let index = rand::thread_rng().gen_range(0..providers.len());
                providers.get(index).cloned()
            }
        }
    }

    fn next_round_robin_slot(&self, capability: &str) -> usize {
        let mut counters = self
            .round_robin
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let counter = counters.entry(capability.to_owned()).or_insert(0);
        let slot = *counter;
        *counter = counter.wrapping_add(1);
        slot
    }

    /// Selects a provider for `capability` and dispatches to it.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NoProvider`] when nobody offers the
    /// capability, otherwise any error from [`MessageRouter::dispatch`].
    pub async fn route(
        &self,
        capability: &str,
        parameters: Value,
        strategy: LoadBalanceStrategy,
        timeout: Option<Duration>,
    ) -> DispatchResult<Message> {
        let receiver = self
            .select_agent(capability, strategy)
            .ok_or_else(|| DispatchError::NoProvider(capability.to_owned()))?;
        let request =
            DispatchRequest::new(receiver, capability, parameters).with_timeout(timeout);
        self.dispatch(request).await
    }

    /// Sends `request` to its receiver and waits for the response.
    ///
    /// The agent's counters are updated on success and on failure; the
    /// global message counter only grows on success.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::AgentNotFound`] for unregistered receivers,
    /// [`DispatchError::TaskTimedOut`] when the deadline elapses, and
    /// [`DispatchError::AgentFailed`] when the agent reports an error,
    /// returns `Err` or panics.
    pub async fn dispatch(&self, request: DispatchRequest) -> DispatchResult<Message> {
        let receiver = request.receiver().clone();
        let agent = self
            .registry
            .agent(&receiver)
            .ok_or_else(|| DispatchError::AgentNotFound(receiver.clone()))?;

        let mut message = Message::request(
            request.sender(),
            receiver.as_str(),
            request.capability(),
            request.parameters().clone(),
            &*self.clock,
        )
        .with_priority(request.priority());
        if let Some(correlation_id) = request.correlation_id() {
            message = message.with_correlation_id(correlation_id);
        }
        let correlation_id = message.correlation_id();
        debug!(
            agent = %receiver,
            capability = request.capability(),
            message_id = %message.id(),
            "dispatching request"
        );

        let started = Instant::now();
        let outcome = match request.timeout() {
            Some(limit) => {
                let mut handle = spawn_handler(agent, message);
                if let Ok(joined) = tokio::time::timeout(limit, &mut handle).await {
                    joined
                } else {
                    handle.abort();
                    let error = DispatchError::TaskTimedOut {
                        capability: request.capability().to_owned(),
                        timeout: limit,
                    };
                    return self.finish(&receiver, started.elapsed(), Err(error));
                }
            }
            None => spawn_handler(agent, message).await,
        };

        let result = interpret_reply(&receiver, correlation_id, outcome);
        self.finish(&receiver, started.elapsed(), result)
    }

    fn finish(
        &self,
        receiver: &AgentName,
        elapsed: Duration,
        result: DispatchResult<Message>,
    ) -> DispatchResult<Message> {
        self.registry.record(receiver, elapsed, result.is_ok());
        self.metrics.record_message(result.is_ok());
        if let Err(err) = &result {
            warn!(
                agent = %receiver,
                error = %err,
                retryable = err.is_retryable(),
                "dispatch failed"
            );
        }
        result
    }
}

fn spawn_handler(
    agent: Arc<dyn Agent>,
    message: Message,
) -> tokio::task::JoinHandle<AgentResult<Message>> {
    tokio::spawn(async move { agent.handle(message).await })
}

fn interpret_reply(
    receiver: &AgentName,
    correlation_id: MessageId,
    outcome: Result<AgentResult<Message>, JoinError>,
) -> DispatchResult<Message> {
    let reply = match outcome {
        Ok(Ok(reply)) => reply,
        Ok(Err(err)) => {
            return Err(DispatchError::AgentFailed {
                agent: receiver.clone(),
                payload: err.to_payload(),
            });
        }
        Err(join_error) => {
            return Err(DispatchError::AgentFailed {
                agent: receiver.clone(),
                payload: join_failure_payload(join_error),
            });
        }
    };

    if reply.correlation_id() != correlation_id {
        return Err(DispatchError::CorrelationMismatch(receiver.clone()));
    }

    match reply.body() {
        MessageBody::Response { .. } => Ok(reply),
        MessageBody::Error(payload) => Err(DispatchError::AgentFailed {
            agent: receiver.clone(),
            payload: payload.clone(),
        }),
        _ => Err(DispatchError::UnexpectedReply {
            agent: receiver.clone(),
            received: reply.message_type(),
        }),
    }
}

fn join_failure_payload(join_error: JoinError) -> ErrorPayload {
    if join_error.is_panic() {
        let detail = panic_message(join_error.into_panic().as_ref());
        ErrorPayload::new(format!("agent panicked: {detail}"), "agent_panic", true)
    } else {
        ErrorPayload::new("agent task was cancelled", "agent_cancelled", true)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|text| (*text).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_owned())
}
