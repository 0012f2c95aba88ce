//! Agent identity: name, version, capabilities and dependencies.

use super::{AgentDomainError, AgentName, Capability};
use serde::{Deserialize, Serialize};

/// Static description of an agent.
///
/// Built once by the agent author and handed to the registry at
/// registration time.
///
/// # Examples
///
/// ```
/// use conductor::agent::domain::{AgentIdentity, Capability};
///
/// let identity = AgentIdentity::new("script_writer", "1.2.0")?
///     .with_description("Writes episode scripts")
///     .with_capability(Capability::new("write_script", "Draft a script")?)?
///     .with_dependency("researcher")?;
///
/// assert!(identity.supports("write_script"));
/// # Ok::<(), conductor::agent::domain::AgentDomainError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentIdentity {
    name: AgentName,
    version: String,
    description: String,
    capabilities: Vec<Capability>,
    dependencies: Vec<AgentName>,
}

impl AgentIdentity {
    /// Creates an identity with no capabilities or dependencies.
    ///
    /// # Errors
    ///
    /// Returns name validation errors from [`AgentName::new`] or
    /// [`AgentDomainError::EmptyVersion`] when the version is blank.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, AgentDomainError> {
        let agent_name = AgentName::new(name)?;
        let trimmed_version = version.into().trim().to_owned();
        if trimmed_version.is_empty() {
            return Err(AgentDomainError::EmptyVersion);
        }
        Ok(Self {
            name: agent_name,
            version: trimmed_version,
            description: String::new(),
            capabilities: Vec::new(),
            dependencies: Vec::new(),
        })
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into().trim().to_owned();
        self
    }

    /// Declares a capability.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDomainError::DuplicateCapability`] when a capability
    /// with the same name is already declared.
    pub fn with_capability(mut self, capability: Capability) -> Result<Self, AgentDomainError> {
        if self.supports(capability.name()) {
            return Err(AgentDomainError::DuplicateCapability {
                agent: self.name.to_string(),
                capability: capability.name().to_owned(),
            });
        }
        self.capabilities.push(capability);
        Ok(self)
    }

    /// Declares a dependency on another agent. Repeated names are ignored.
    ///
    /// # Errors
    ///
    /// Returns name validation errors, or
    /// [`AgentDomainError::SelfDependency`] when the agent names itself.
    pub fn with_dependency(mut self, agent: impl Into<String>) -> Result<Self, AgentDomainError> {
        let dependency = AgentName::new(agent)?;
        if dependency == self.name {
            return Err(AgentDomainError::SelfDependency(self.name.to_string()));
        }
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        Ok(self)
    }

    /// Returns the agent name.
    #[must_use]
    pub const fn name(&self) -> &AgentName {
        &self.name
    }

    /// Returns the agent version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the declared capabilities in declaration order.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Returns the names of agents this agent depends on.
    #[must_use]
    pub fn dependencies(&self) -> &[AgentName] {
        &self.dependencies
    }

    /// Returns the capability with the given name, if declared.
    #[must_use]
    pub fn capability(&self, name: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.name() == name)
    }

    /// Returns whether the capability is declared.
    #[must_use]
    pub fn supports(&self, capability: &str) -> bool {
        self.capability(capability).is_some()
    }
}
