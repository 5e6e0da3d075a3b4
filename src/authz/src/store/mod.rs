//! Storage collaborators
//!
//! The engine only needs get/create/update/list with "not found",
//! "already exists" and "conflict" signaled distinctly. `create` on the
//! binding store must be atomic: it is the only guard keeping one record per
//! (project, policy) pair.

use crate::types::{LocalIdentity, Policy, ProjectPolicy};
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::{InMemoryBindingStore, InMemoryIdentityStore, InMemoryPolicyStore};

#[cfg(feature = "postgres")]
pub use postgres::PostgresBindingStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Policy records
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<Policy>;

    async fn create(&self, policy: Policy) -> StoreResult<Policy>;

    async fn list(&self, tenant_id: &str) -> StoreResult<Vec<Policy>>;
}

/// Project policy binding records, keyed by `project_policy_name`
#[async_trait]
pub trait BindingStore: Send + Sync {
    async fn get(&self, name: &str) -> StoreResult<ProjectPolicy>;

    /// Fails with `AlreadyExists` if a record with the same name exists
    async fn create(&self, binding: ProjectPolicy) -> StoreResult<ProjectPolicy>;

    /// Fails with `Conflict` if `binding.resource_version` is stale
    async fn update(&self, binding: ProjectPolicy) -> StoreResult<ProjectPolicy>;
}

/// Local identity records
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get(&self, name: &str) -> StoreResult<LocalIdentity>;

    /// Identities matching both tenant and username
    async fn list(&self, tenant_id: &str, username: &str) -> StoreResult<Vec<LocalIdentity>>;

    /// Identities of a tenant
    async fn list_tenant(&self, tenant_id: &str) -> StoreResult<Vec<LocalIdentity>>;

    async fn create(&self, identity: LocalIdentity) -> StoreResult<LocalIdentity>;

    async fn update(&self, identity: LocalIdentity) -> StoreResult<LocalIdentity>;
}
