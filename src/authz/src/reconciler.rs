//! Project policy binding reconciler
//!
//! Attaches subjects to, and detaches them from, the single binding record of
//! a (project, policy) pair. The record is created lazily on first bind. When
//! two first-binds race, the store's atomic create lets exactly one of them
//! win and the loser re-reads the winner's record; no lock is involved.

use crate::config::EngineConfig;
use crate::error::{BindingError, Result};
use crate::keys::project_policy_name;
use crate::scope::{RequestContext, ScopeResolver};
use crate::store::{BindingStore, PolicyStore, StoreError};
use crate::types::{BindingRequest, BindingSubjects, Policy, ProjectId, ProjectPolicy};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Conflict retries granted to a bind that found no record. Racing first
/// binds all hold the freshly created version, so all but one must re-read.
const FIRST_BIND_CONFLICT_RETRIES: u32 = 3;

/// Subject change applied to a binding record
#[derive(Debug, Clone, Copy)]
enum Mutation<'a> {
    Attach(&'a BindingSubjects),
    Detach(&'a BindingSubjects),
}

impl Mutation<'_> {
    fn apply(&self, binding: &mut ProjectPolicy) {
        match self {
            Mutation::Attach(subjects) => {
                for user in &subjects.users {
                    binding.users.insert(user.clone());
                }
                for group in &subjects.groups {
                    let mut group = group.clone();
                    // a group without an id is keyed by its name, keep it
                    if !group.id.is_empty() {
                        group.name.clear();
                    }
                    binding.groups.insert(group);
                }
            }
            Mutation::Detach(subjects) => {
                binding.users = binding.users.difference(&subjects.users);
                binding.groups = binding.groups.difference(&subjects.groups);
            }
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            Mutation::Attach(_) => "bind",
            Mutation::Detach(_) => "unbind",
        }
    }
}

/// Create-or-update workflow for project policy bindings
pub struct BindingReconciler {
    policies: Arc<dyn PolicyStore>,
    bindings: Arc<dyn BindingStore>,
    scopes: ScopeResolver,
    update_conflict_retries: u32,
}

impl BindingReconciler {
    pub fn new(
        policies: Arc<dyn PolicyStore>,
        bindings: Arc<dyn BindingStore>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            policies,
            bindings,
            scopes: ScopeResolver::new(),
            update_conflict_retries: config.update_conflict_retries,
        }
    }

    /// Replace the default project scope resolver
    pub fn with_scope_resolver(mut self, scopes: ScopeResolver) -> Self {
        self.scopes = scopes;
        self
    }

    /// Attach the request's subjects to the project binding of its policy
    ///
    /// Creates the binding record if it does not exist yet.
    ///
    /// # Errors
    ///
    /// - `MissingPolicyReference` if the request names no policy
    /// - `PolicyNotFound` if the policy does not exist
    /// - `ScopeMismatch` if the policy is not project-scoped
    /// - `StoreConflict` if the record changed underneath the update and no
    ///   retries are left. A bind that created or raced to create the record
    ///   retries at least `FIRST_BIND_CONFLICT_RETRIES` times.
    #[instrument(skip(self, ctx, request), fields(policy = %request.policy_id))]
    pub async fn bind(&self, ctx: &RequestContext, request: &BindingRequest) -> Result<ProjectPolicy> {
        let (policy, project) = self.resolve(ctx, request).await?;
        let name = project_policy_name(&project, &policy.id);

        let (binding, first_bind) = self.get_or_create(&name, &policy, &project).await?;
        let retries = if first_bind {
            self.update_conflict_retries.max(FIRST_BIND_CONFLICT_RETRIES)
        } else {
            self.update_conflict_retries
        };
        self.persist(binding, Mutation::Attach(&request.subjects), retries)
            .await
    }

    /// Detach the request's subjects from the project binding of its policy
    ///
    /// # Errors
    ///
    /// As [`bind`](Self::bind), plus `BindingNotFound` when the project has
    /// no binding record for the policy. Unbind never creates a record.
    #[instrument(skip(self, ctx, request), fields(policy = %request.policy_id))]
    pub async fn unbind(&self, ctx: &RequestContext, request: &BindingRequest) -> Result<ProjectPolicy> {
        let (policy, project) = self.resolve(ctx, request).await?;
        let name = project_policy_name(&project, &policy.id);

        let binding = self
            .bindings
            .get(&name)
            .await
            .map_err(|e| binding_lookup_error(&name, e))?;
        self.persist(binding, Mutation::Detach(&request.subjects), self.update_conflict_retries)
            .await
    }

    /// Validation and lookups shared by bind and unbind; writes nothing
    async fn resolve(&self, ctx: &RequestContext, request: &BindingRequest) -> Result<(Policy, ProjectId)> {
        if request.policy_id.trim().is_empty() {
            return Err(BindingError::MissingPolicyReference);
        }

        let policy = self.policies.get(&request.policy_id).await.map_err(|e| {
            error!(policy = %request.policy_id, error = %e, "get policy failed");
            if e.is_not_found() {
                BindingError::PolicyNotFound(request.policy_id.clone())
            } else {
                e.into()
            }
        })?;

        self.scopes.validate_policy(&policy)?;
        let project = self.scopes.effective_scope(ctx)?;
        Ok((policy, project))
    }

    /// The record and whether it was missing when this call looked
    async fn get_or_create(
        &self,
        name: &str,
        policy: &Policy,
        project: &str,
    ) -> Result<(ProjectPolicy, bool)> {
        match self.bindings.get(name).await {
            Ok(binding) => return Ok((binding, false)),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let fresh = ProjectPolicy::empty(&policy.tenant_id, project, &policy.id);
        match self.bindings.create(fresh).await {
            Ok(created) => {
                debug!(binding = name, project, "created project policy binding");
                Ok((created, true))
            }
            Err(e) if e.is_already_exists() => {
                debug!(binding = name, "binding created concurrently, re-reading");
                let binding = self
                    .bindings
                    .get(name)
                    .await
                    .map_err(|e| binding_lookup_error(name, e))?;
                Ok((binding, true))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(
        &self,
        mut binding: ProjectPolicy,
        mutation: Mutation<'_>,
        retries: u32,
    ) -> Result<ProjectPolicy> {
        let mut attempt = 0;
        loop {
            mutation.apply(&mut binding);

            match self.bindings.update(binding.clone()).await {
                Ok(updated) => {
                    info!(
                        policy = %updated.policy_id,
                        project = %updated.project_id,
                        users = ?updated.users,
                        groups = ?updated.groups,
                        "{} project policy subjects",
                        mutation.verb()
                    );
                    return Ok(updated);
                }
                Err(StoreError::Conflict(msg)) if attempt < retries => {
                    attempt += 1;
                    warn!(
                        binding = %binding.name,
                        attempt,
                        max = retries,
                        conflict = %msg,
                        "binding update conflicted, re-reading"
                    );
                    binding = self
                        .bindings
                        .get(&binding.name)
                        .await
                        .map_err(|e| binding_lookup_error(&binding.name, e))?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn binding_lookup_error(name: &str, err: StoreError) -> BindingError {
    if err.is_not_found() {
        BindingError::BindingNotFound(name.to_string())
    } else {
        err.into()
    }
}
