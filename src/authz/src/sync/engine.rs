//! Identity policy sync engine

use super::binder::PolicyBinder;
use super::slot::{DeclaredPolicies, PolicyDisplayNames};
use crate::config::EngineConfig;
use crate::error::{Result, SyncFailures, SyncPhase};
use crate::evaluator::{policy_roles, Evaluator};
use crate::store::PolicyStore;
use crate::types::{BindingSubjects, LocalIdentity, PolicyId};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Result of a successful sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The identity carried no declaration
    NothingToDo,
    /// Evaluator grants now match the declaration
    Converged {
        added: Vec<PolicyId>,
        removed: Vec<PolicyId>,
    },
}

/// Converges evaluator grants with identity policy declarations
pub struct PolicySyncEngine {
    evaluator: Arc<dyn Evaluator>,
    binder: Arc<dyn PolicyBinder>,
    policies: Arc<dyn PolicyStore>,
    config: EngineConfig,
}

impl PolicySyncEngine {
    pub fn new(
        evaluator: Arc<dyn Evaluator>,
        binder: Arc<dyn PolicyBinder>,
        policies: Arc<dyn PolicyStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            evaluator,
            binder,
            policies,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Policies currently granted to `identity` through direct evaluator links
    pub async fn granted_policies(&self, identity: &LocalIdentity) -> Vec<PolicyId> {
        let roles = self
            .evaluator
            .roles_reachable(&identity.subject_key(), &self.config.evaluator_domain)
            .await;
        policy_roles(roles, &self.config.policy_prefix)
    }

    /// Bind newly declared policies and unbind undeclared ones
    ///
    /// The declaration slot is removed from `identity` before any remote
    /// call, whatever the outcome; the caller persists the cleared identity.
    /// Every bind and unbind is attempted. Failures are collected into a
    /// single `PartialSyncFailure` naming each failed policy.
    #[instrument(skip(self, identity), fields(tenant = %identity.tenant_id, user = %identity.username))]
    pub async fn sync_identity_policies(&self, identity: &mut LocalIdentity) -> Result<SyncOutcome> {
        let Some(declared) = DeclaredPolicies::take_from(
            identity,
            &self.config.policies_key,
            &self.config.policy_prefix,
        ) else {
            debug!("no policy declaration on identity");
            return Ok(SyncOutcome::NothingToDo);
        };

        let previous = self.granted_policies(identity).await;

        let added: Vec<PolicyId> = declared
            .iter()
            .filter(|p| !previous.contains(p))
            .cloned()
            .collect();
        let removed: Vec<PolicyId> = previous
            .iter()
            .filter(|p| !declared.contains(p))
            .cloned()
            .collect();

        info!(?added, ?removed, "syncing identity policies");

        let subjects = BindingSubjects::users(vec![identity.as_subject()]);
        let mut failures = SyncFailures::new();

        let binds = join_all(added.iter().map(|p| self.binder.bind(p, &subjects))).await;
        for (policy_id, result) in added.iter().zip(binds) {
            if let Err(e) = result {
                error!(policy = %policy_id, user = %identity.username, error = %e, "bind policy failed");
                failures.push(policy_id.as_str(), SyncPhase::Bind, &e);
            }
        }

        let unbinds = join_all(removed.iter().map(|p| self.binder.unbind(p, &subjects))).await;
        for (policy_id, result) in removed.iter().zip(unbinds) {
            if let Err(e) = result {
                error!(policy = %policy_id, user = %identity.username, error = %e, "unbind policy failed");
                failures.push(policy_id.as_str(), SyncPhase::Unbind, &e);
            }
        }

        failures.into_result()?;
        Ok(SyncOutcome::Converged { added, removed })
    }

    /// Replace each identity's slot with the display names of its granted policies
    ///
    /// Policy lookups are memoized for this call only. A failed lookup is
    /// logged and the policy left out of that identity's map.
    #[instrument(skip_all, fields(identities = identities.len()))]
    pub async fn fill_policy_display_names(&self, identities: &mut [LocalIdentity]) {
        let mut display_names: HashMap<PolicyId, String> = HashMap::new();

        for identity in identities.iter_mut() {
            let mut names = PolicyDisplayNames::new();

            for policy_id in self.granted_policies(identity).await {
                if let Some(display_name) = display_names.get(&policy_id) {
                    names.insert(policy_id, display_name.clone());
                    continue;
                }

                match self.policies.get(&policy_id).await {
                    Ok(policy) => {
                        display_names.insert(policy_id.clone(), policy.display_name.clone());
                        names.insert(policy_id, policy.display_name);
                    }
                    Err(e) => {
                        error!(policy = %policy_id, error = %e, "get policy failed");
                    }
                }
            }

            match names.to_slot_value() {
                Ok(raw) => {
                    identity.extra.insert(self.config.policies_key.clone(), raw);
                }
                Err(e) => {
                    error!(user = %identity.username, error = %e, "encode policy display names failed");
                }
            }
        }
    }
}
