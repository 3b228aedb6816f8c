//! Advisory check of declared secrets against the environment.
//!
//! The audit never blocks a run. Missing secrets are reported so the user can
//! export them before running the generated solution.

use std::collections::HashMap;
use tracing::{debug, warn};

/// Read-only view of environment variables.
pub trait Environment: Send + Sync {
    /// Whether the variable is set. An empty value still counts as set.
    fn contains(&self, name: &str) -> bool;
}

/// The current process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn contains(&self, name: &str) -> bool {
        std::env::var_os(name).is_some()
    }
}

impl Environment for HashMap<String, String> {
    fn contains(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

/// Presence of a single declared secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretStatus {
    pub name: String,
    pub present: bool,
}

/// Result of auditing declared secrets, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditResult {
    entries: Vec<SecretStatus>,
}

impl AuditResult {
    /// All audited secrets.
    pub fn entries(&self) -> &[SecretStatus] {
        &self.entries
    }

    /// Whether the named secret was found. `None` if it was not declared.
    pub fn is_present(&self, name: &str) -> Option<bool> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.present)
    }

    /// Declared secrets absent from the environment.
    pub fn missing(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.present)
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Declared secrets found in the environment.
    pub fn present(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.present)
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn all_present(&self) -> bool {
        self.entries.iter().all(|e| e.present)
    }
}

/// Checks declared secrets against an [`Environment`].
pub struct RequirementAuditor {
    env: Box<dyn Environment>,
}

impl RequirementAuditor {
    /// Audit against the current process environment.
    pub fn new() -> Self {
        Self::with_environment(Box::new(ProcessEnvironment))
    }

    pub fn with_environment(env: Box<dyn Environment>) -> Self {
        Self { env }
    }

    /// Report the presence of each declared secret. Duplicate names are audited once.
    pub fn audit(&self, declared: &[String]) -> AuditResult {
        let mut entries: Vec<SecretStatus> = Vec::with_capacity(declared.len());

        for name in declared {
            if entries.iter().any(|e| &e.name == name) {
                continue;
            }
            let present = self.env.contains(name);
            if present {
                debug!("Secret {} is set", name);
            } else {
                warn!("Secret {} is not set in the environment", name);
            }
            entries.push(SecretStatus {
                name: name.clone(),
                present,
            });
        }

        AuditResult { entries }
    }
}

impl Default for RequirementAuditor {
    fn default() -> Self {
        Self::new()
    }
}
