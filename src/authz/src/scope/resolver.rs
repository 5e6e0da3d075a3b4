/// Scope resolver
///
/// Resolves the effective project of a request and checks that a policy may
/// be bound inside it.

use tracing::debug;

use super::types::RequestContext;
use crate::error::{BindingError, Result};
use crate::types::{Policy, PolicyScope, ProjectId};

/// Resolves request scopes and validates policy scope compatibility
///
/// # Examples
///
/// ```
/// use polbind_authz::scope::{RequestContext, ScopeResolver};
/// use polbind_authz::{Policy, PolicyScope};
///
/// let resolver = ScopeResolver::new();
///
/// let project = Policy::new("pol-x", "default", "Viewer", PolicyScope::Project);
/// assert!(resolver.validate_policy(&project).is_ok());
///
/// let platform = Policy::new("pol-y", "default", "Admin", PolicyScope::Platform);
/// assert!(resolver.validate_policy(&platform).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    /// Scope kind a policy must declare to be bindable here
    required: PolicyScope,
}

impl ScopeResolver {
    /// Resolver for project-scoped bindings
    pub fn new() -> Self {
        Self::for_scope(PolicyScope::Project)
    }

    /// Resolver accepting policies of `required` scope
    pub fn for_scope(required: PolicyScope) -> Self {
        Self { required }
    }

    pub fn required_scope(&self) -> PolicyScope {
        self.required
    }

    /// Effective scope: the hint when non-empty, otherwise the fallback name
    ///
    /// # Errors
    ///
    /// `InvalidInput` if neither carries a value; deriving a binding key
    /// from an empty scope would collide across projects.
    pub fn effective_scope(&self, ctx: &RequestContext) -> Result<ProjectId> {
        if let Some(hint) = ctx.hint() {
            debug!(project = hint, "scope resolved from request hint");
            return Ok(hint.to_string());
        }

        let fallback = ctx.fallback_name.trim();
        if fallback.is_empty() {
            return Err(BindingError::InvalidInput(
                "unable to determine project from request".to_string(),
            ));
        }

        debug!(project = fallback, "scope resolved from request path");
        Ok(fallback.to_string())
    }

    /// Reject policies whose declared scope is not the one this resolver binds in
    pub fn validate_policy(&self, policy: &Policy) -> Result<()> {
        if policy.scope != self.required {
            return Err(BindingError::ScopeMismatch {
                policy: policy.id.clone(),
                scope: policy.scope.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ScopeResolver {
    fn default() -> Self {
        Self::new()
    }
}
