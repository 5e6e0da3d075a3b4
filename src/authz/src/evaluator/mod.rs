//! Authorization evaluator seam
//!
//! The engine never resolves role hierarchies itself. It asks the evaluator
//! which roles a subject holds in a domain and keeps only the identifiers
//! carrying the policy prefix.

use crate::types::{PolicyId, RoleId};
use async_trait::async_trait;

pub mod enforcer;

pub use enforcer::CasbinEvaluator;

/// Read-only role query against the evaluator's role graph
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Roles held by `subject_key` in `domain`, in evaluator order
    async fn roles_reachable(&self, subject_key: &str, domain: &str) -> Vec<RoleId>;
}

/// Keep the policy-derived roles, dropping duplicates
pub fn policy_roles(roles: Vec<RoleId>, prefix: &str) -> Vec<PolicyId> {
    let mut policies: Vec<PolicyId> = Vec::new();
    for role in roles {
        if role.starts_with(prefix) && !policies.contains(&role) {
            policies.push(role);
        }
    }
    policies
}
