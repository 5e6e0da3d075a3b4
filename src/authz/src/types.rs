//! Core binding types

use crate::subjects::SubjectSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Unique policy identifier (e.g. "pol-7f3a")
pub type PolicyId = String;

/// Project identifier
pub type ProjectId = String;

/// Tenant identifier
pub type TenantId = String;

/// Role identifier as returned by the evaluator
pub type RoleId = String;

/// A user or group reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Stable identifier
    #[serde(default)]
    pub id: String,

    /// Display label
    #[serde(default)]
    pub name: String,
}

impl Subject {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Subject known only by name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
        }
    }
}

/// Where a policy may be bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyScope {
    /// Platform-wide policy
    Platform,
    /// Policy bindable inside a project
    Project,
}

impl fmt::Display for PolicyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyScope::Platform => write!(f, "platform"),
            PolicyScope::Project => write!(f, "project"),
        }
    }
}

/// Policy definition, as far as binding is concerned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique policy identifier, also its internal name
    pub id: PolicyId,

    /// Owning tenant
    pub tenant_id: TenantId,

    /// Human readable name
    pub display_name: String,

    /// Platform-wide or project-scoped
    pub scope: PolicyScope,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Policy {
    pub fn new(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        display_name: impl Into<String>,
        scope: PolicyScope,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            display_name: display_name.into(),
            scope,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Subjects carried by a bind or unbind request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSubjects {
    #[serde(default)]
    pub users: Vec<Subject>,

    #[serde(default)]
    pub groups: Vec<Subject>,
}

impl BindingSubjects {
    pub fn users(users: Vec<Subject>) -> Self {
        Self {
            users,
            groups: Vec::new(),
        }
    }

    pub fn with_groups(mut self, groups: Vec<Subject>) -> Self {
        self.groups = groups;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty()
    }
}

/// Project-level bind/unbind request body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingRequest {
    /// Target policy
    #[serde(default)]
    pub policy_id: PolicyId,

    #[serde(flatten)]
    pub subjects: BindingSubjects,
}

impl BindingRequest {
    pub fn new(policy_id: impl Into<String>, subjects: BindingSubjects) -> Self {
        Self {
            policy_id: policy_id.into(),
            subjects,
        }
    }
}

/// Materialized attachment of subjects to one policy inside one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPolicy {
    /// Deterministic key derived from (project, policy)
    pub name: String,

    pub tenant_id: TenantId,
    pub project_id: ProjectId,
    pub policy_id: PolicyId,

    #[serde(default)]
    pub users: SubjectSet,

    #[serde(default)]
    pub groups: SubjectSet,

    /// Optimistic concurrency token, bumped by the store on every write
    #[serde(default)]
    pub resource_version: u64,

    pub created_at: DateTime<Utc>,
}

impl ProjectPolicy {
    /// Empty binding record for a (project, policy) pair
    pub fn empty(tenant_id: &str, project_id: &str, policy_id: &str) -> Self {
        Self {
            name: crate::keys::project_policy_name(project_id, policy_id),
            tenant_id: tenant_id.to_string(),
            project_id: project_id.to_string(),
            policy_id: policy_id.to_string(),
            users: SubjectSet::new(),
            groups: SubjectSet::new(),
            resource_version: 0,
            created_at: Utc::now(),
        }
    }
}

/// Local user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIdentity {
    /// Globally unique identity name
    pub name: String,

    pub tenant_id: TenantId,

    pub username: String,

    #[serde(default)]
    pub display_name: String,

    /// Free-form attributes; the `policies` slot is owned by the sync engine
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl LocalIdentity {
    pub fn new(
        name: impl Into<String>,
        tenant_id: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tenant_id: tenant_id.into(),
            username: username.into(),
            display_name: String::new(),
            extra: HashMap::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Key of this identity in the evaluator's role graph
    pub fn subject_key(&self) -> String {
        crate::keys::user_key(&self.tenant_id, &self.username)
    }

    /// This identity as a policy binding subject
    pub fn as_subject(&self) -> Subject {
        Subject::new(self.name.clone(), self.username.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_request_wire_shape() {
        let json = r#"{
            "policy_id": "pol-x",
            "users": [{"id": "usr-1", "name": "alice"}],
            "groups": [{"id": "grp-1"}]
        }"#;
        let request: BindingRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.policy_id, "pol-x");
        assert_eq!(request.subjects.users, vec![Subject::new("usr-1", "alice")]);
        assert_eq!(request.subjects.groups, vec![Subject::new("grp-1", "")]);
    }

    #[test]
    fn test_missing_policy_id_deserializes_empty() {
        let request: BindingRequest = serde_json::from_str(r#"{"users": []}"#).unwrap();
        assert!(request.policy_id.is_empty());
        assert!(request.subjects.is_empty());
    }

    #[test]
    fn test_policy_scope_serde() {
        assert_eq!(serde_json::to_string(&PolicyScope::Project).unwrap(), "\"project\"");
        let scope: PolicyScope = serde_json::from_str("\"platform\"").unwrap();
        assert_eq!(scope, PolicyScope::Platform);
    }

    #[test]
    fn test_identity_subject_key() {
        let identity = LocalIdentity::new("usr-1", "default", "alice");
        assert_eq!(identity.subject_key(), "default##user##alice");
        assert_eq!(identity.as_subject(), Subject::new("usr-1", "alice"));
    }

    #[test]
    fn test_empty_project_policy() {
        let binding = ProjectPolicy::empty("default", "proj-1", "pol-x");
        assert_eq!(binding.name, "proj-1-pol-x");
        assert!(binding.users.is_empty());
        assert!(binding.groups.is_empty());
        assert_eq!(binding.resource_version, 0);
    }
}
