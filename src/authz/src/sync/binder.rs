//! Policy-level subject binding
//!
//! Attaches subjects to a policy outside any project, by linking their
//! evaluator subject keys to the policy role.

use crate::config::EngineConfig;
use crate::error::{BindingError, Result};
use crate::evaluator::CasbinEvaluator;
use crate::keys::{group_key, user_key};
use crate::store::PolicyStore;
use crate::subjects::SubjectKey;
use crate::types::{BindingSubjects, Policy, Subject};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Attach or detach subjects at the policy level
#[async_trait]
pub trait PolicyBinder: Send + Sync {
    async fn bind(&self, policy_id: &str, subjects: &BindingSubjects) -> Result<()>;

    async fn unbind(&self, policy_id: &str, subjects: &BindingSubjects) -> Result<()>;
}

/// [`PolicyBinder`] writing grouping links into a [`CasbinEvaluator`]
pub struct EvaluatorPolicyBinder {
    policies: Arc<dyn PolicyStore>,
    evaluator: Arc<CasbinEvaluator>,
    domain: String,
}

impl EvaluatorPolicyBinder {
    pub fn new(
        policies: Arc<dyn PolicyStore>,
        evaluator: Arc<CasbinEvaluator>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            policies,
            evaluator,
            domain: config.evaluator_domain.clone(),
        }
    }

    async fn policy(&self, policy_id: &str) -> Result<Policy> {
        self.policies.get(policy_id).await.map_err(|e| {
            if e.is_not_found() {
                BindingError::PolicyNotFound(policy_id.to_string())
            } else {
                e.into()
            }
        })
    }

    /// Evaluator keys of every subject, users first
    fn subject_keys(policy: &Policy, subjects: &BindingSubjects) -> Result<Vec<String>> {
        let mut keys = Vec::with_capacity(subjects.users.len() + subjects.groups.len());
        for user in &subjects.users {
            if user.name.is_empty() {
                return Err(BindingError::InvalidInput(format!(
                    "user subject '{}' has no name",
                    user.id
                )));
            }
            keys.push(user_key(&policy.tenant_id, &user.name));
        }
        for group in &subjects.groups {
            keys.push(group_key(&policy.tenant_id, group_identifier(group)));
        }
        Ok(keys)
    }
}

fn group_identifier(group: &Subject) -> &str {
    match group.key() {
        SubjectKey::Id(id) => id,
        SubjectKey::Name(name) => name,
    }
}

#[async_trait]
impl PolicyBinder for EvaluatorPolicyBinder {
    async fn bind(&self, policy_id: &str, subjects: &BindingSubjects) -> Result<()> {
        let policy = self.policy(policy_id).await?;
        let keys = Self::subject_keys(&policy, subjects)?;

        for key in &keys {
            self.evaluator.grant(key, &policy.id, &self.domain).await?;
        }
        info!(policy = %policy.id, subjects = ?keys, "bind policy subjects");
        Ok(())
    }

    async fn unbind(&self, policy_id: &str, subjects: &BindingSubjects) -> Result<()> {
        let policy = self.policy(policy_id).await?;
        let keys = Self::subject_keys(&policy, subjects)?;

        for key in &keys {
            if !self.evaluator.revoke(key, &policy.id, &self.domain).await? {
                debug!(policy = %policy.id, subject = %key, "subject was not bound");
            }
        }
        info!(policy = %policy.id, subjects = ?keys, "unbind policy subjects");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Evaluator;
    use crate::store::InMemoryPolicyStore;
    use crate::types::PolicyScope;

    async fn binder() -> (EvaluatorPolicyBinder, Arc<CasbinEvaluator>) {
        let policies = Arc::new(InMemoryPolicyStore::with_policies(vec![Policy::new(
            "pol-a",
            "default",
            "Viewer",
            PolicyScope::Platform,
        )]));
        let evaluator = Arc::new(CasbinEvaluator::new().await.unwrap());
        let binder = EvaluatorPolicyBinder::new(policies, evaluator.clone(), &EngineConfig::default());
        (binder, evaluator)
    }

    #[tokio::test]
    async fn test_bind_links_users_and_groups() {
        let (binder, evaluator) = binder().await;
        let subjects = BindingSubjects::users(vec![Subject::new("usr-1", "alice")])
            .with_groups(vec![Subject::new("grp-1", "Ops")]);

        binder.bind("pol-a", &subjects).await.unwrap();

        assert_eq!(evaluator.roles_reachable("default##user##alice", "").await, vec!["pol-a"]);
        assert_eq!(evaluator.roles_reachable("default##group##grp-1", "").await, vec!["pol-a"]);
    }

    #[tokio::test]
    async fn test_unbind_removes_links() {
        let (binder, evaluator) = binder().await;
        let subjects = BindingSubjects::users(vec![Subject::new("usr-1", "alice")]);

        binder.bind("pol-a", &subjects).await.unwrap();
        binder.unbind("pol-a", &subjects).await.unwrap();
        binder.unbind("pol-a", &subjects).await.unwrap();

        assert!(evaluator.roles_reachable("default##user##alice", "").await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_policy() {
        let (binder, _) = binder().await;
        let err = binder
            .bind("pol-zzz", &BindingSubjects::users(vec![Subject::new("usr-1", "alice")]))
            .await
            .unwrap_err();
        assert!(matches!(err, BindingError::PolicyNotFound(_)));
    }

    #[tokio::test]
    async fn test_nameless_user_rejected() {
        let (binder, evaluator) = binder().await;
        let err = binder
            .bind("pol-a", &BindingSubjects::users(vec![Subject::new("usr-1", "")]))
            .await
            .unwrap_err();
        assert!(matches!(err, BindingError::InvalidInput(_)));
        assert!(evaluator.roles_reachable("default##user##", "").await.is_empty());
    }
}
