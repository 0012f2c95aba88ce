//! Unit tests for agent domain types.

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]

use crate::agent::domain::{
    AgentDomainError, AgentIdentity, AgentName, AgentRegistration, AgentStatus, Capability,
    ParseAgentStatusError,
};
use crate::clock::ManualClock;
use chrono::Duration as ChronoDuration;
use rstest::rstest;
use serde_json::json;
use std::time::Duration;

fn writer_identity() -> AgentIdentity {
    AgentIdentity::new("script_writer", "1.0.0")
        .and_then(|identity| identity.with_capability(Capability::new("write_script", "Drafts")?))
        .expect("valid identity")
}

// ── AgentName validation ───────────────────────────────────────────

#[rstest]
#[case("script_writer")]
#[case("agent-1")]
#[case("Video.Producer")]
#[case("a")]
fn valid_agent_names_are_accepted(#[case] input: &str) {
    let name = AgentName::new(input).expect("valid name");
    assert_eq!(name.as_str(), input);
}

#[rstest]
fn agent_name_is_trimmed_but_keeps_case() {
    let name = AgentName::new("  ScriptWriter ").expect("valid after trim");
    assert_eq!(name.as_str(), "ScriptWriter");
}

#[rstest]
#[case("")]
#[case("   ")]
fn empty_agent_name_is_rejected(#[case] input: &str) {
    assert_eq!(AgentName::new(input), Err(AgentDomainError::EmptyAgentName));
}

#[rstest]
#[case("script writer")]
#[case("writer/v2")]
#[case("writer:1")]
fn invalid_characters_in_agent_name_are_rejected(#[case] input: &str) {
    assert!(matches!(
        AgentName::new(input),
        Err(AgentDomainError::InvalidAgentName(_))
    ));
}

#[rstest]
#[case(100, true)]
#[case(101, false)]
fn agent_name_length_boundary(#[case] length: usize, #[case] expected_ok: bool) {
    let result = AgentName::new("a".repeat(length));
    assert_eq!(result.is_ok(), expected_ok, "length {length}");
}

#[rstest]
fn agent_name_deserialisation_validates() {
    let parsed: Result<AgentName, _> = serde_json::from_value(json!("bad name"));
    assert!(parsed.is_err());
    let valid: AgentName = serde_json::from_value(json!("good_name")).expect("valid name");
    assert_eq!(valid, "good_name");
}

// ── AgentStatus ────────────────────────────────────────────────────

#[rstest]
#[case(AgentStatus::Idle, "idle")]
#[case(AgentStatus::Busy, "busy")]
#[case(AgentStatus::Error, "error")]
#[case(AgentStatus::Offline, "offline")]
fn agent_status_as_str_round_trip(#[case] status: AgentStatus, #[case] expected: &str) {
    assert_eq!(status.as_str(), expected);
    assert_eq!(AgentStatus::try_from(expected), Ok(status));
}

#[rstest]
fn unknown_agent_status_is_rejected() {
    assert_eq!(
        AgentStatus::try_from("sleeping"),
        Err(ParseAgentStatusError("sleeping".to_owned()))
    );
}

// ── Capability and identity ────────────────────────────────────────

#[rstest]
fn capability_builder_sets_schemas_and_estimate() {
    let capability = Capability::new(" render ", "Render a clip")
        .expect("valid capability")
        .with_input_schema(json!({"type": "object"}))
        .with_output_schema(json!({"type": "string"}))
        .with_estimated_duration(Duration::from_secs(30));

    assert_eq!(capability.name(), "render");
    assert_eq!(capability.input_schema(), &json!({"type": "object"}));
    assert_eq!(capability.output_schema(), &json!({"type": "string"}));
    assert_eq!(capability.estimated_duration(), Some(Duration::from_secs(30)));
}

#[rstest]
fn blank_capability_name_is_rejected() {
    assert_eq!(
        Capability::new("  ", "nothing"),
        Err(AgentDomainError::EmptyCapabilityName)
    );
}

#[rstest]
fn blank_version_is_rejected() {
    assert_eq!(
        AgentIdentity::new("writer", " "),
        Err(AgentDomainError::EmptyVersion)
    );
}

#[rstest]
fn duplicate_capability_is_rejected() {
    let result = writer_identity()
        .with_capability(Capability::new("write_script", "again").expect("valid capability"));

    assert!(matches!(
        result,
        Err(AgentDomainError::DuplicateCapability { .. })
    ));
}

#[rstest]
fn dependencies_are_deduplicated_and_self_reference_rejected() {
    let identity = writer_identity()
        .with_dependency("researcher")
        .and_then(|identity| identity.with_dependency("researcher"))
        .expect("valid dependencies");
    assert_eq!(identity.dependencies().len(), 1);

    assert_eq!(
        writer_identity().with_dependency("script_writer"),
        Err(AgentDomainError::SelfDependency("script_writer".to_owned()))
    );
}

#[rstest]
fn identity_reports_supported_capabilities() {
    let identity = writer_identity();
    assert!(identity.supports("write_script"));
    assert!(!identity.supports("render"));
    assert!(identity.capability("write_script").is_some());
}

// ── AgentRegistration counters and health ──────────────────────────

#[rstest]
fn new_registration_starts_with_zeroed_counters() {
    let clock = ManualClock::starting_now();
    let registration = AgentRegistration::new(writer_identity(), &clock);

    assert_eq!(registration.message_count(), 0);
    assert_eq!(registration.error_count(), 0);
    assert_eq!(registration.registered_at(), registration.last_heartbeat());
    assert!(registration.average_execution_time().is_none());
}

#[rstest]
fn record_accumulates_counters_and_time() {
    let clock = ManualClock::starting_now();
    let mut registration = AgentRegistration::new(writer_identity(), &clock);

    registration.record(Duration::from_millis(100), true);
    registration.record(Duration::from_millis(300), false);

    assert_eq!(registration.message_count(), 2);
    assert_eq!(registration.error_count(), 1);
    assert_eq!(registration.total_execution_time(), Duration::from_millis(400));
    assert_eq!(
        registration.average_execution_time(),
        Some(Duration::from_millis(200))
    );
}

#[rstest]
#[case(59, true)]
#[case(60, false)]
#[case(61, false)]
fn registration_health_depends_on_heartbeat_age(#[case] elapsed: i64, #[case] healthy: bool) {
    let clock = ManualClock::starting_now();
    let registration = AgentRegistration::new(writer_identity(), &clock);

    clock.advance(ChronoDuration::seconds(elapsed));

    assert_eq!(
        registration.is_healthy(Duration::from_secs(60), &clock),
        healthy
    );
}

#[rstest]
fn heartbeat_refreshes_health() {
    let clock = ManualClock::starting_now();
    let mut registration = AgentRegistration::new(writer_identity(), &clock);
    clock.advance(ChronoDuration::seconds(120));
    assert!(!registration.is_healthy(Duration::from_secs(60), &clock));

    registration.heartbeat(&clock);

    assert!(registration.is_healthy(Duration::from_secs(60), &clock));
}
