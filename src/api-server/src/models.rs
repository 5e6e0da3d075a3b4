use chrono::{DateTime, Utc};
use polbind_authz::{
    BindingRequest, BindingSubjects, LocalIdentity, Policy, PolicyScope, ProjectPolicy, Subject,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// User or group reference
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SubjectModel {
    /// Stable identifier
    #[serde(default)]
    pub id: String,

    /// Display label
    #[serde(default)]
    pub name: String,
}

impl From<SubjectModel> for Subject {
    fn from(model: SubjectModel) -> Self {
        Subject::new(model.id, model.name)
    }
}

impl From<Subject> for SubjectModel {
    fn from(subject: Subject) -> Self {
        Self {
            id: subject.id,
            name: subject.name,
        }
    }
}

/// Bind or unbind request body
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct BindingRequestBody {
    /// Target policy
    #[serde(default, rename = "policyID", alias = "policy_id")]
    #[validate(length(max = 255))]
    pub policy_id: String,

    #[serde(default)]
    #[validate(length(max = 1000))]
    pub users: Vec<SubjectModel>,

    #[serde(default)]
    #[validate(length(max = 1000))]
    pub groups: Vec<SubjectModel>,
}

impl From<BindingRequestBody> for BindingRequest {
    fn from(body: BindingRequestBody) -> Self {
        let subjects = BindingSubjects::users(body.users.into_iter().map(Into::into).collect())
            .with_groups(body.groups.into_iter().map(Into::into).collect());
        BindingRequest::new(body.policy_id, subjects)
    }
}

/// Project policy binding record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectPolicyResponse {
    pub name: String,
    pub tenant_id: String,
    pub project_id: String,
    pub policy_id: String,
    pub users: Vec<SubjectModel>,
    pub groups: Vec<SubjectModel>,
    pub resource_version: u64,
    pub created_at: DateTime<Utc>,
}

impl From<ProjectPolicy> for ProjectPolicyResponse {
    fn from(binding: ProjectPolicy) -> Self {
        Self {
            name: binding.name,
            tenant_id: binding.tenant_id,
            project_id: binding.project_id,
            policy_id: binding.policy_id,
            users: binding.users.into_iter().map(Into::into).collect(),
            groups: binding.groups.into_iter().map(Into::into).collect(),
            resource_version: binding.resource_version,
            created_at: binding.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScopeModel {
    Platform,
    Project,
}

impl From<ScopeModel> for PolicyScope {
    fn from(scope: ScopeModel) -> Self {
        match scope {
            ScopeModel::Platform => PolicyScope::Platform,
            ScopeModel::Project => PolicyScope::Project,
        }
    }
}

impl From<PolicyScope> for ScopeModel {
    fn from(scope: PolicyScope) -> Self {
        match scope {
            PolicyScope::Platform => ScopeModel::Platform,
            PolicyScope::Project => ScopeModel::Project,
        }
    }
}

/// Policy creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePolicyRequest {
    /// Policy ID, carrying the policy prefix
    #[validate(length(min = 1, max = 255))]
    pub id: String,

    #[validate(length(min = 1, max = 255))]
    pub tenant_id: String,

    #[validate(length(min = 1, max = 255))]
    pub display_name: String,

    pub scope: ScopeModel,

    #[validate(length(max = 1024))]
    pub description: Option<String>,
}

impl From<CreatePolicyRequest> for Policy {
    fn from(req: CreatePolicyRequest) -> Self {
        let policy = Policy::new(req.id, req.tenant_id, req.display_name, req.scope.into());
        match req.description {
            Some(description) => policy.with_description(description),
            None => policy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PolicyResponse {
    pub id: String,
    pub tenant_id: String,
    pub display_name: String,
    pub scope: ScopeModel,
    pub description: Option<String>,
}

impl From<Policy> for PolicyResponse {
    fn from(policy: Policy) -> Self {
        Self {
            id: policy.id,
            tenant_id: policy.tenant_id,
            display_name: policy.display_name,
            scope: policy.scope.into(),
            description: policy.description,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListPoliciesResponse {
    pub items: Vec<PolicyResponse>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PolicyQuery {
    /// Tenant to list
    pub tenant_id: String,
}

/// Local identity create or update request
///
/// `extra.policies` may carry a comma-separated list of declared policies.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct IdentityRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(length(min = 1, max = 255))]
    pub tenant_id: String,

    #[validate(length(min = 1, max = 255))]
    pub username: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl From<IdentityRequest> for LocalIdentity {
    fn from(req: IdentityRequest) -> Self {
        let mut identity = LocalIdentity::new(req.name, req.tenant_id, req.username);
        identity.display_name = req.display_name;
        identity.extra = req.extra;
        identity
    }
}

/// Local identity; on reads `extra.policies` maps policy IDs to display names
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdentityResponse {
    pub name: String,
    pub tenant_id: String,
    pub username: String,
    pub display_name: String,
    pub extra: HashMap<String, String>,
}

impl From<LocalIdentity> for IdentityResponse {
    fn from(identity: LocalIdentity) -> Self {
        Self {
            name: identity.name,
            tenant_id: identity.tenant_id,
            username: identity.username,
            display_name: identity.display_name,
            extra: identity.extra,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListIdentitiesResponse {
    pub items: Vec<IdentityResponse>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IdentityQuery {
    /// Tenant to list
    pub tenant_id: String,

    /// Restrict to one username
    pub username: Option<String>,
}

/// One failed policy bind or unbind of an identity sync
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SyncFailureModel {
    pub policy_id: String,
    pub phase: String,
    pub message: String,
}

/// Error body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,

    /// Present for partial sync failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failures: Option<Vec<SyncFailureModel>>,
}
