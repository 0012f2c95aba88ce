//! Unit tests for coordination messages.

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]

use crate::message::domain::{
    ErrorPayload, Message, MessageBody, MessagePriority, MessageType, ParseMessageTypeError,
};
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::json;

fn request() -> Message {
    Message::request(
        "coordinator",
        "script_writer",
        "write_script",
        json!({"topic": "rust"}),
        &DefaultClock,
    )
}

#[rstest]
fn request_starts_its_own_correlation_chain() {
    let message = request();

    assert_eq!(message.message_type(), MessageType::Request);
    assert_eq!(message.correlation_id(), message.id());
    assert_eq!(message.priority(), MessagePriority::Medium);
    let (task, parameters) = message.as_request().expect("request body");
    assert_eq!(task, "write_script");
    assert_eq!(parameters, &json!({"topic": "rust"}));
}

#[rstest]
fn reply_swaps_endpoints_and_keeps_correlation() {
    let original = request().with_priority(MessagePriority::High);
    let reply = original.reply(json!({"script": "..."}), &DefaultClock);

    assert_eq!(reply.sender(), "script_writer");
    assert_eq!(reply.receiver(), "coordinator");
    assert_eq!(reply.correlation_id(), original.id());
    assert_ne!(reply.id(), original.id());
    assert_eq!(reply.priority(), MessagePriority::High);
    assert!(reply.as_request().is_none());
}

#[rstest]
fn error_reply_carries_payload() {
    let original = request();
    let payload = ErrorPayload::new("model unavailable", "upstream", true);
    let reply = original.reply_error(payload.clone(), &DefaultClock);

    assert_eq!(reply.message_type(), MessageType::Error);
    assert_eq!(reply.body(), &MessageBody::Error(payload));
}

#[rstest]
#[case(1.5, 1.0)]
#[case(-0.2, 0.0)]
#[case(0.25, 0.25)]
#[case(f64::NAN, 0.0)]
fn progress_is_clamped(#[case] raw: f64, #[case] expected: f64) {
    let update = request().progress(raw, None, &DefaultClock);

    match update.body() {
        MessageBody::Progress { progress, .. } => assert!((progress - expected).abs() < f64::EPSILON),
        other => panic!("expected progress body, got {other:?}"),
    }
}

#[rstest]
fn body_serialises_with_type_tag() {
    let message = request();
    let value = serde_json::to_value(message.body()).expect("serialisable body");

    assert_eq!(value.get("type"), Some(&json!("request")));
    assert_eq!(value.get("task"), Some(&json!("write_script")));
}

#[rstest]
#[case(MessageType::Request, "request")]
#[case(MessageType::Response, "response")]
#[case(MessageType::Notification, "notification")]
#[case(MessageType::Error, "error")]
#[case(MessageType::Progress, "progress")]
fn message_type_parses_canonical_names(#[case] kind: MessageType, #[case] text: &str) {
    assert_eq!(kind.as_str(), text);
    assert_eq!(MessageType::try_from(text), Ok(kind));
}

#[rstest]
fn unknown_message_type_is_rejected() {
    assert_eq!(
        MessageType::try_from("broadcast"),
        Err(ParseMessageTypeError("broadcast".to_owned()))
    );
}

#[rstest]
fn priority_parses_case_insensitively() {
    assert_eq!(MessagePriority::try_from(" HIGH "), Ok(MessagePriority::High));
    assert!(MessagePriority::try_from("urgent").is_err());
}
