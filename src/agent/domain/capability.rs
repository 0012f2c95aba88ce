//! Capability declarations.

use super::AgentDomainError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// A named operation an agent can perform.
///
/// Schemas are free-form JSON documents describing the expected parameters
/// and produced result. Capabilities are immutable once declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    name: String,
    description: String,
    input_schema: Value,
    output_schema: Value,
    estimated_duration: Option<Duration>,
}

impl Capability {
    /// Creates a capability with empty object schemas.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDomainError::EmptyCapabilityName`] when the name is
    /// blank.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, AgentDomainError> {
        let trimmed = name.into().trim().to_owned();
        if trimmed.is_empty() {
            return Err(AgentDomainError::EmptyCapabilityName);
        }
        Ok(Self {
            name: trimmed,
            description: description.into().trim().to_owned(),
            input_schema: Value::Object(serde_json::Map::new()),
            output_schema: Value::Object(serde_json::Map::new()),
            estimated_duration: None,
        })
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Sets the output schema.
    #[must_use]
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = schema;
        self
    }

    /// Sets the typical run time.
    #[must_use]
    pub const fn with_estimated_duration(mut self, duration: Duration) -> Self {
        self.estimated_duration = Some(duration);
        self
    }

    /// Returns the capability name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the input schema.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Returns the output schema.
    #[must_use]
    pub const fn output_schema(&self) -> &Value {
        &self.output_schema
    }

    /// Returns the estimated duration, if declared.
    #[must_use]
    pub const fn estimated_duration(&self) -> Option<Duration> {
        self.estimated_duration
    }
}
