// src/strategy/registry.rs

use crate::strategy::implementations::BASELINE_POLICY;
use serde::{Deserialize, Serialize};

/// One row of the inventory policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(rename = "InventoryPolicyName")]
    pub name: String,
    #[serde(rename = "DirectoryName")]
    pub directory: String,
    #[serde(rename = "ActiveFlag")]
    pub active: bool,
}

/// Known policies, whether they are running, and where their orders live.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRegistry {
    policies: Vec<PolicyConfig>,
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new(vec![PolicyConfig {
            name: BASELINE_POLICY.to_string(),
            directory: BASELINE_POLICY.to_string(),
            active: true,
        }])
    }
}

impl PolicyRegistry {
    pub fn new(policies: Vec<PolicyConfig>) -> Self {
        Self { policies }
    }

    pub fn policies(&self) -> &[PolicyConfig] {
        &self.policies
    }

    fn find(&self, name: &str) -> Option<&PolicyConfig> {
        self.policies.iter().find(|p| p.name == name)
    }

    /// Unknown policies are inactive.
    pub fn is_active(&self, name: &str) -> bool {
        self.find(name).map(|p| p.active).unwrap_or(false)
    }

    /// Unknown policies use their own name as directory.
    pub fn directory<'a>(&'a self, name: &'a str) -> &'a str {
        self.find(name).map(|p| p.directory.as_str()).unwrap_or(name)
    }
}
