//! Unit tests for provider selection and dispatch.

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]

use crate::agent::{
    adapters::{ManagedAgent, Script, ScriptedAgent},
    domain::{AgentIdentity, AgentName, AgentStatus, Capability},
    ports::{Agent, AgentError, AgentResult},
    services::AgentRegistry,
};
use crate::clock::SharedClock;
use crate::message::domain::{Message, MessageBody, MessageType};
use crate::metrics::CoordinatorMetrics;
use crate::routing::{
    domain::{DispatchError, DispatchRequest, LoadBalanceStrategy},
    services::MessageRouter,
};
use async_trait::async_trait;
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    clock: SharedClock,
    registry: Arc<AgentRegistry>,
    metrics: Arc<CoordinatorMetrics>,
    router: MessageRouter,
}

impl Harness {
    fn register_handler(&self, handler: ScriptedAgent) {
        let agent = Arc::new(ManagedAgent::new(handler, Arc::clone(&self.clock)));
        self.registry.register(agent).expect("registration should succeed");
    }

    fn register(&self, name: &str, capabilities: &[&str]) {
        self.register_handler(
            ScriptedAgent::with_capabilities(name, capabilities).expect("valid scripted agent"),
        );
    }
}

#[fixture]
fn harness() -> Harness {
    let clock: SharedClock = Arc::new(DefaultClock);
    let registry = Arc::new(AgentRegistry::new(Arc::clone(&clock)));
    let metrics = Arc::new(CoordinatorMetrics::new());
    let router = MessageRouter::new(
        Arc::clone(&registry),
        Arc::clone(&metrics),
        Arc::clone(&clock),
    );
    Harness {
        clock,
        registry,
        metrics,
        router,
    }
}

fn name(raw: &str) -> AgentName {
    AgentName::new(raw).expect("valid agent name")
}

fn payload_of(err: &DispatchError) -> Option<(&str, bool)> {
    match err {
        DispatchError::AgentFailed { payload, .. } => {
            Some((payload.error_type.as_str(), payload.retryable))
        }
        _ => None,
    }
}

/// Agent whose `handle` is a plain function, for reply shapes the managed
/// wrapper never produces.
struct RawAgent {
    identity: AgentIdentity,
    respond: fn(Message) -> AgentResult<Message>,
}

impl RawAgent {
    fn new(raw_name: &str, respond: fn(Message) -> AgentResult<Message>) -> Self {
        let identity = AgentIdentity::new(raw_name, "1.0.0")
            .and_then(|identity| {
                identity.with_capability(Capability::new("render", "render frames")?)
            })
            .expect("valid identity");
        Self { identity, respond }
    }
}

#[async_trait]
impl Agent for RawAgent {
    fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    async fn handle(&self, message: Message) -> AgentResult<Message> {
        (self.respond)(message)
    }
}

#[rstest]
fn round_robin_cycles_through_providers(harness: Harness) {
    harness.register("renderer_a", &["render"]);
    harness.register("renderer_b", &["render"]);
    harness.register("renderer_c", &["render"]);

    let picks: Vec<AgentName> = (0..6)
        .filter_map(|_| {
            harness
                .router
                .select_agent("render", LoadBalanceStrategy::RoundRobin)
        })
        .collect();

    assert_eq!(
        picks,
        vec![
            name("renderer_a"),
            name("renderer_b"),
            name("renderer_c"),
            name("renderer_a"),
            name("renderer_b"),
            name("renderer_c"),
        ]
    );
}

#[rstest]
fn round_robin_counters_are_per_capability(harness: Harness) {
    harness.register("renderer_a", &["render", "encode"]);
    harness.register("renderer_b", &["render", "encode"]);

    let render = harness
        .router
        .select_agent("render", LoadBalanceStrategy::RoundRobin);
    let encode = harness
        .router
        .select_agent("encode", LoadBalanceStrategy::RoundRobin);

    assert_eq!(render, Some(name("renderer_a")));
    assert_eq!(encode, Some(name("renderer_a")));
}

#[rstest]
#[case(LoadBalanceStrategy::RoundRobin)]
#[case(LoadBalanceStrategy::LeastLoaded)]
#[case(LoadBalanceStrategy::Random)]
fn single_provider_is_always_selected(harness: Harness, #[case] strategy: LoadBalanceStrategy) {
    harness.register("renderer", &["render"]);

    for _ in 0..3 {
        assert_eq!(
            harness.router.select_agent("render", strategy),
            Some(name("renderer"))
        );
    }
}

#[rstest]
#[case(LoadBalanceStrategy::RoundRobin)]
#[case(LoadBalanceStrategy::LeastLoaded)]
#[case(LoadBalanceStrategy::Random)]
fn unknown_capability_selects_nobody(harness: Harness, #[case] strategy: LoadBalanceStrategy) {
    harness.register("renderer", &["render"]);

    assert_eq!(harness.router.select_agent("transcribe", strategy), None);
}

#[rstest]
fn least_loaded_prefers_idle_provider_and_breaks_ties_by_order(harness: Harness) {
    harness.register("renderer_a", &["render"]);
    harness.register("renderer_b", &["render"]);

    assert_eq!(
        harness
            .router
            .select_agent("render", LoadBalanceStrategy::LeastLoaded),
        Some(name("renderer_a"))
    );

    harness
        .registry
        .record(&name("renderer_a"), Duration::from_millis(5), true);

    assert_eq!(
        harness
            .router
            .select_agent("render", LoadBalanceStrategy::LeastLoaded),
        Some(name("renderer_b"))
    );
}

#[rstest]
fn random_selection_stays_within_providers(harness: Harness) {
    harness.register("renderer_a", &["render"]);
    harness.register("renderer_b", &["render"]);
    let providers = harness.registry.find_agents("render");

    for _ in 0..20 {
        let pick = harness
            .router
            .select_agent("render", LoadBalanceStrategy::Random)
            .expect("a provider");
        assert!(providers.contains(&pick));
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dispatch_returns_response_and_records_success(harness: Harness) {
    harness.register_handler(
        ScriptedAgent::with_capabilities("renderer", &["render"])
            .expect("valid handler")
            .on("render", Script::reply(json!({"frames": 24}))),
    );

    let reply = harness
        .router
        .dispatch(DispatchRequest::new(
            name("renderer"),
            "render",
            json!({"scene": 1}),
        ))
        .await
        .expect("dispatch should succeed");

    assert_eq!(
        reply.body(),
        &MessageBody::Response {
            result: json!({"frames": 24})
        }
    );
    assert_eq!(reply.sender(), "renderer");
    let snapshot = harness.registry.get(&name("renderer")).expect("registered");
    assert_eq!(snapshot.message_count(), 1);
    assert_eq!(snapshot.error_count(), 0);
    assert_eq!(harness.metrics.messages_processed(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dispatch_to_unknown_agent_fails_without_counting(harness: Harness) {
    let err = harness
        .router
        .dispatch(DispatchRequest::new(name("ghost"), "render", json!({})))
        .await
        .expect_err("unknown agent");

    assert_eq!(err, DispatchError::AgentNotFound(name("ghost")));
    assert!(!err.is_retryable());
    assert_eq!(harness.metrics.snapshot(0, 0).messages_failed, 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn route_without_provider_reports_capability(harness: Harness) {
    let err = harness
        .router
        .route("render", json!({}), LoadBalanceStrategy::RoundRobin, None)
        .await
        .expect_err("no provider");

    assert_eq!(err, DispatchError::NoProvider("render".to_owned()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn route_dispatches_to_selected_provider(harness: Harness) {
    harness.register("renderer", &["render"]);

    let reply = harness
        .router
        .route(
            "render",
            json!({"scene": 3}),
            LoadBalanceStrategy::LeastLoaded,
            Some(Duration::from_secs(5)),
        )
        .await
        .expect("route should succeed");

    assert_eq!(
        reply.body(),
        &MessageBody::Response {
            result: json!({"scene": 3})
        }
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn error_reply_becomes_agent_failure_and_counts(harness: Harness) {
    harness.register_handler(
        ScriptedAgent::with_capabilities("renderer", &["render"])
            .expect("valid handler")
            .on(
                "render",
                Script::fail_with(AgentError::permanent("codec missing", "codec_error")),
            ),
    );

    let err = harness
        .router
        .dispatch(DispatchRequest::new(name("renderer"), "render", json!({})))
        .await
        .expect_err("agent failure");

    assert_eq!(payload_of(&err), Some(("codec_error", false)));
    assert!(!err.is_retryable());
    let snapshot = harness.registry.get(&name("renderer")).expect("registered");
    assert_eq!(snapshot.message_count(), 1);
    assert_eq!(snapshot.error_count(), 1);
    assert_eq!(snapshot.status(), AgentStatus::Error);
    assert_eq!(harness.metrics.snapshot(1, 1).messages_failed, 1);
    assert_eq!(harness.metrics.messages_processed(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn slow_agent_times_out(harness: Harness) {
    harness.register_handler(
        ScriptedAgent::with_capabilities("renderer", &["render"])
            .expect("valid handler")
            .on(
                "render",
                Script::reply(json!("late")).after(Duration::from_secs(5)),
            ),
    );
    let limit = Duration::from_millis(50);

    let err = harness
        .router
        .dispatch(
            DispatchRequest::new(name("renderer"), "render", json!({})).with_timeout(limit),
        )
        .await
        .expect_err("timeout");

    assert_eq!(
        err,
        DispatchError::TaskTimedOut {
            capability: "render".to_owned(),
            timeout: limit,
        }
    );
    assert!(err.is_retryable());
    let snapshot = harness.registry.get(&name("renderer")).expect("registered");
    assert_eq!(snapshot.error_count(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn panicking_agent_is_reported_as_retryable_failure(harness: Harness) {
    harness.register_handler(
        ScriptedAgent::with_capabilities("renderer", &["render"])
            .expect("valid handler")
            .on("render", Script::panic("frame buffer exploded")),
    );

    let err = harness
        .router
        .dispatch(DispatchRequest::new(name("renderer"), "render", json!({})))
        .await
        .expect_err("panic surfaces as failure");

    assert_eq!(payload_of(&err), Some(("agent_panic", true)));
    assert!(err.to_string().contains("frame buffer exploded"));
    let snapshot = harness.registry.get(&name("renderer")).expect("registered");
    assert_eq!(snapshot.error_count(), 1);
    assert_eq!(snapshot.status(), AgentStatus::Error);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn handler_err_is_translated_to_payload(harness: Harness) {
    let agent = RawAgent::new("renderer", |_| Err(AgentError::Offline("renderer".into())));
    harness
        .registry
        .register(Arc::new(agent))
        .expect("registration should succeed");

    let err = harness
        .router
        .dispatch(DispatchRequest::new(name("renderer"), "render", json!({})))
        .await
        .expect_err("err result");

    assert_eq!(payload_of(&err), Some(("agent_offline", true)));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn uncorrelated_reply_is_rejected(harness: Harness) {
    let agent = RawAgent::new("renderer", |message| {
        Ok(Message::request(
            "renderer",
            message.sender(),
            "render",
            json!({}),
            &DefaultClock,
        ))
    });
    harness
        .registry
        .register(Arc::new(agent))
        .expect("registration should succeed");

    let err = harness
        .router
        .dispatch(DispatchRequest::new(name("renderer"), "render", json!({})))
        .await
        .expect_err("mismatch");

    assert_eq!(err, DispatchError::CorrelationMismatch(name("renderer")));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn progress_reply_is_unexpected(harness: Harness) {
    let agent = RawAgent::new("renderer", |message| {
        Ok(message.progress(0.5, None, &DefaultClock))
    });
    harness
        .registry
        .register(Arc::new(agent))
        .expect("registration should succeed");

    let err = harness
        .router
        .dispatch(DispatchRequest::new(name("renderer"), "render", json!({})))
        .await
        .expect_err("unexpected reply");

    assert_eq!(
        err,
        DispatchError::UnexpectedReply {
            agent: name("renderer"),
            received: MessageType::Progress,
        }
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn explicit_correlation_id_is_preserved(harness: Harness) {
    harness.register("renderer", &["render"]);
    let origin = Message::request("planner", "coordinator", "plan", json!({}), &DefaultClock);

    let reply = harness
        .router
        .dispatch(
            DispatchRequest::new(name("renderer"), "render", json!({}))
                .with_correlation_id(origin.correlation_id()),
        )
        .await
        .expect("dispatch should succeed");

    assert_eq!(reply.correlation_id(), origin.correlation_id());
}
