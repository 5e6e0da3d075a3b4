//! Typed view of the identity policies slot
//!
//! On input the slot holds a comma-separated declaration (`"pol-a, pol-b"`).
//! On output it holds a JSON object mapping policy ids to display names.

use crate::types::{LocalIdentity, PolicyId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared policy identifiers, deduplicated, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredPolicies(Vec<PolicyId>);

impl DeclaredPolicies {
    /// Parse a comma-separated declaration, keeping tokens carrying `prefix`
    pub fn parse(raw: &str, prefix: &str) -> Self {
        let mut declared = Vec::new();
        for token in raw.split(',').map(str::trim) {
            if token.starts_with(prefix) && !declared.iter().any(|p: &PolicyId| p == token) {
                declared.push(token.to_string());
            }
        }
        Self(declared)
    }

    /// Remove the slot from `identity` and parse it
    ///
    /// `None` when the identity carries no declaration at all. A present but
    /// empty slot declares zero policies.
    pub fn take_from(identity: &mut LocalIdentity, key: &str, prefix: &str) -> Option<Self> {
        identity
            .extra
            .remove(key)
            .map(|raw| Self::parse(&raw, prefix))
    }

    pub fn contains(&self, policy_id: &str) -> bool {
        self.0.iter().any(|p| p == policy_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PolicyId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Policy id to display name map written back into the slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyDisplayNames(BTreeMap<PolicyId, String>);

impl PolicyDisplayNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, policy_id: impl Into<PolicyId>, display_name: impl Into<String>) {
        self.0.insert(policy_id.into(), display_name.into());
    }

    pub fn get(&self, policy_id: &str) -> Option<&str> {
        self.0.get(policy_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON encoding stored in the slot
    pub fn to_slot_value(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }

    pub fn from_slot_value(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
