//! Casbin-backed evaluator
//!
//! Holds an in-memory enforcer with an RBAC-with-domains model. Policy
//! grants are grouping links `(subject key, policy id, domain)`.

use super::Evaluator;
use crate::error::{BindingError, Result};
use crate::types::RoleId;
use async_trait::async_trait;
use casbin::{CoreApi, DefaultModel, Enforcer, MemoryAdapter, MgmtApi, RbacApi};
use tokio::sync::RwLock;
use tracing::debug;

/// RBAC model with domains
pub const MODEL_CONF: &str = r#"
[request_definition]
r = sub, dom, obj, act

[policy_definition]
p = sub, dom, obj, act

[role_definition]
g = _, _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = g(r.sub, p.sub, r.dom) && r.dom == p.dom && keyMatch2(r.obj, p.obj) && r.act == p.act
"#;

pub struct CasbinEvaluator {
    enforcer: RwLock<Enforcer>,
}

impl CasbinEvaluator {
    /// Empty evaluator using [`MODEL_CONF`]
    pub async fn new() -> Result<Self> {
        let model = DefaultModel::from_str(MODEL_CONF)
            .await
            .map_err(|e| BindingError::Evaluator(format!("load model: {}", e)))?;
        let adapter = MemoryAdapter::default();
        let enforcer = Enforcer::new(model, adapter)
            .await
            .map_err(|e| BindingError::Evaluator(format!("build enforcer: {}", e)))?;

        Ok(Self::from_enforcer(enforcer))
    }

    /// Wrap an already configured enforcer
    pub fn from_enforcer(enforcer: Enforcer) -> Self {
        Self {
            enforcer: RwLock::new(enforcer),
        }
    }

    /// Link `subject_key` to `role` in `domain`
    ///
    /// Returns `false` if the link already existed.
    pub async fn grant(&self, subject_key: &str, role: &str, domain: &str) -> Result<bool> {
        let added = self
            .enforcer
            .write()
            .await
            .add_grouping_policy(link(subject_key, role, domain))
            .await
            .map_err(|e| BindingError::Evaluator(format!("add grouping policy: {}", e)))?;
        debug!(subject = subject_key, role, domain, added, "evaluator link granted");
        Ok(added)
    }

    /// Remove the link between `subject_key` and `role` in `domain`
    ///
    /// Returns `false` if there was no such link.
    pub async fn revoke(&self, subject_key: &str, role: &str, domain: &str) -> Result<bool> {
        let removed = self
            .enforcer
            .write()
            .await
            .remove_grouping_policy(link(subject_key, role, domain))
            .await
            .map_err(|e| BindingError::Evaluator(format!("remove grouping policy: {}", e)))?;
        debug!(subject = subject_key, role, domain, removed, "evaluator link revoked");
        Ok(removed)
    }
}

fn link(subject_key: &str, role: &str, domain: &str) -> Vec<String> {
    vec![subject_key.to_string(), role.to_string(), domain.to_string()]
}

#[async_trait]
impl Evaluator for CasbinEvaluator {
    async fn roles_reachable(&self, subject_key: &str, domain: &str) -> Vec<RoleId> {
        let enforcer = self.enforcer.read().await;
        enforcer.get_roles_for_user(subject_key, Some(domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_grant_and_query() {
        let evaluator = CasbinEvaluator::new().await.unwrap();
        assert!(evaluator.grant("default##user##alice", "pol-a", "").await.unwrap());
        assert!(!evaluator.grant("default##user##alice", "pol-a", "").await.unwrap());
        evaluator.grant("default##user##alice", "pol-b", "").await.unwrap();

        let mut roles = evaluator.roles_reachable("default##user##alice", "").await;
        roles.sort();
        assert_eq!(roles, vec!["pol-a", "pol-b"]);
    }

    #[tokio::test]
    async fn test_revoke() {
        let evaluator = CasbinEvaluator::new().await.unwrap();
        evaluator.grant("default##user##alice", "pol-a", "").await.unwrap();
        assert!(evaluator.revoke("default##user##alice", "pol-a", "").await.unwrap());
        assert!(!evaluator.revoke("default##user##alice", "pol-a", "").await.unwrap());

        assert!(evaluator.roles_reachable("default##user##alice", "").await.is_empty());
    }

    #[tokio::test]
    async fn test_domains_are_isolated() {
        let evaluator = CasbinEvaluator::new().await.unwrap();
        evaluator.grant("default##user##alice", "pol-a", "tenant-a").await.unwrap();

        assert!(evaluator.roles_reachable("default##user##alice", "tenant-b").await.is_empty());
        assert_eq!(
            evaluator.roles_reachable("default##user##alice", "tenant-a").await,
            vec!["pol-a"]
        );
    }
}
