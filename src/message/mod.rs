//! Coordination messages exchanged between the coordinator and agents.
//!
//! Every dispatch is a [`domain::Message`] of type `Request`; agents answer
//! with a `Response` or an `Error`, and may emit `Progress` or
//! `Notification` messages that share the request's correlation id.

pub mod domain;

#[cfg(test)]
mod tests;
