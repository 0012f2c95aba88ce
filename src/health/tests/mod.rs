//! Unit tests for the health monitor.

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]

use crate::agent::{
    adapters::{ManagedAgent, ScriptedAgent},
    domain::{AgentName, AgentStatus},
    ports::Agent,
    services::AgentRegistry,
};
use crate::clock::{ManualClock, SharedClock};
use crate::health::{HealthMonitor, HealthMonitorError};
use chrono::Duration as ChronoDuration;
use rstest::{fixture, rstest};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(60);

struct Harness {
    clock: ManualClock,
    registry: Arc<AgentRegistry>,
}

impl Harness {
    fn register(&self, name: &str) -> Arc<ManagedAgent<ScriptedAgent>> {
        let shared: SharedClock = Arc::new(self.clock.clone());
        let handler = ScriptedAgent::with_capabilities(name, &["render"]).expect("valid handler");
        let agent = Arc::new(ManagedAgent::new(handler, shared));
        self.registry
            .register(agent.clone())
            .expect("registration should succeed");
        agent
    }

    fn monitor(&self, interval: Duration) -> HealthMonitor {
        HealthMonitor::new(Arc::clone(&self.registry), interval, TIMEOUT)
    }
}

#[fixture]
fn harness() -> Harness {
    let clock = ManualClock::starting_now();
    let shared: SharedClock = Arc::new(clock.clone());
    Harness {
        clock,
        registry: Arc::new(AgentRegistry::new(shared)),
    }
}

fn name(raw: &str) -> AgentName {
    AgentName::new(raw).expect("valid agent name")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_evicts_only_stale_agents(harness: Harness) {
    let stale = harness.register("stale");
    let fresh = harness.register("fresh");
    harness.clock.advance(ChronoDuration::seconds(61));
    assert!(harness.registry.heartbeat(&name("fresh")));

    let evicted = harness.monitor(Duration::from_secs(30)).sweep().await;

    assert_eq!(evicted, vec![name("stale")]);
    assert_eq!(harness.registry.find_agents("render"), vec![name("fresh")]);
    assert_eq!(stale.status(), AgentStatus::Offline);
    assert_ne!(fresh.status(), AgentStatus::Offline);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_keeps_agents_inside_the_timeout(harness: Harness) {
    let agent = harness.register("renderer");
    harness.clock.advance(ChronoDuration::seconds(59));

    assert!(harness.monitor(Duration::from_secs(30)).sweep().await.is_empty());
    assert!(harness.registry.contains(&name("renderer")));
    assert_ne!(agent.status(), AgentStatus::Offline);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn running_loop_evicts_on_next_tick(harness: Harness) {
    let agent = harness.register("renderer");
    let monitor = harness.monitor(Duration::from_millis(20));
    monitor.start().expect("monitor should start");

    harness.clock.advance(ChronoDuration::seconds(120));
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(harness.registry.find_agents("render").is_empty());
    assert_eq!(agent.status(), AgentStatus::Offline);
    assert!(monitor.stop().await);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn start_twice_is_rejected(harness: Harness) {
    let monitor = harness.monitor(Duration::from_millis(20));

    monitor.start().expect("first start");

    assert_eq!(monitor.start(), Err(HealthMonitorError::AlreadyRunning));
    assert!(monitor.is_running());
    assert!(monitor.stop().await);
    assert!(!monitor.is_running());
    assert!(!monitor.stop().await);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn monitor_can_restart_after_stop(harness: Harness) {
    let monitor = harness.monitor(Duration::from_millis(20));

    monitor.start().expect("first start");
    assert!(monitor.stop().await);

    assert_eq!(monitor.start(), Ok(()));
    assert!(monitor.stop().await);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn zero_interval_is_rejected(harness: Harness) {
    let monitor = harness.monitor(Duration::ZERO);

    assert_eq!(monitor.start(), Err(HealthMonitorError::ZeroInterval));
    assert!(!monitor.is_running());
}
