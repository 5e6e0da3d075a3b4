//! In-memory stores

use super::{BindingStore, IdentityStore, PolicyStore, StoreError, StoreResult};
use crate::types::{LocalIdentity, Policy, PolicyId, ProjectPolicy};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory policy store
#[derive(Clone, Default)]
pub struct InMemoryPolicyStore {
    policies: Arc<RwLock<HashMap<PolicyId, Policy>>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `policies`
    pub fn with_policies(policies: impl IntoIterator<Item = Policy>) -> Self {
        let map = policies.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            policies: Arc::new(RwLock::new(map)),
        }
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn get(&self, id: &str) -> StoreResult<Policy> {
        self.policies
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("policy {}", id)))
    }

    async fn create(&self, policy: Policy) -> StoreResult<Policy> {
        let mut policies = self.policies.write().await;
        if policies.contains_key(&policy.id) {
            return Err(StoreError::AlreadyExists(format!("policy {}", policy.id)));
        }
        policies.insert(policy.id.clone(), policy.clone());
        Ok(policy)
    }

    async fn list(&self, tenant_id: &str) -> StoreResult<Vec<Policy>> {
        let policies = self.policies.read().await;
        let mut matching: Vec<Policy> = policies
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matching)
    }
}

/// In-memory binding store
///
/// `create` goes through the map entry API, so two concurrent creators of
/// the same name see exactly one success and one `AlreadyExists`.
#[derive(Clone, Default)]
pub struct InMemoryBindingStore {
    bindings: Arc<DashMap<String, ProjectPolicy>>,
}

impl InMemoryBindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of binding records
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[async_trait]
impl BindingStore for InMemoryBindingStore {
    async fn get(&self, name: &str) -> StoreResult<ProjectPolicy> {
        self.bindings
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("projectpolicy {}", name)))
    }

    async fn create(&self, mut binding: ProjectPolicy) -> StoreResult<ProjectPolicy> {
        match self.bindings.entry(binding.name.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(format!(
                "projectpolicy {}",
                binding.name
            ))),
            Entry::Vacant(slot) => {
                binding.resource_version = 1;
                slot.insert(binding.clone());
                Ok(binding)
            }
        }
    }

    async fn update(&self, mut binding: ProjectPolicy) -> StoreResult<ProjectPolicy> {
        let mut current = self
            .bindings
            .get_mut(&binding.name)
            .ok_or_else(|| StoreError::NotFound(format!("projectpolicy {}", binding.name)))?;

        if current.resource_version != binding.resource_version {
            return Err(StoreError::Conflict(format!(
                "projectpolicy {} has been modified: resource version {} is stale (current {})",
                binding.name, binding.resource_version, current.resource_version
            )));
        }

        binding.resource_version += 1;
        *current = binding.clone();
        Ok(binding)
    }
}

/// In-memory identity store
#[derive(Clone, Default)]
pub struct InMemoryIdentityStore {
    identities: Arc<RwLock<HashMap<String, LocalIdentity>>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn get(&self, name: &str) -> StoreResult<LocalIdentity> {
        self.identities
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("localidentity {}", name)))
    }

    async fn list(&self, tenant_id: &str, username: &str) -> StoreResult<Vec<LocalIdentity>> {
        let identities = self.identities.read().await;
        let mut matching: Vec<LocalIdentity> = identities
            .values()
            .filter(|i| i.tenant_id == tenant_id && i.username == username)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matching)
    }

    async fn list_tenant(&self, tenant_id: &str) -> StoreResult<Vec<LocalIdentity>> {
        let identities = self.identities.read().await;
        let mut matching: Vec<LocalIdentity> = identities
            .values()
            .filter(|i| i.tenant_id == tenant_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matching)
    }

    async fn create(&self, identity: LocalIdentity) -> StoreResult<LocalIdentity> {
        let mut identities = self.identities.write().await;
        if identities.contains_key(&identity.name) {
            return Err(StoreError::AlreadyExists(format!("localidentity {}", identity.name)));
        }
        identities.insert(identity.name.clone(), identity.clone());
        Ok(identity)
    }

    async fn update(&self, identity: LocalIdentity) -> StoreResult<LocalIdentity> {
        let mut identities = self.identities.write().await;
        match identities.get_mut(&identity.name) {
            Some(current) => {
                *current = identity.clone();
                Ok(identity)
            }
            None => Err(StoreError::NotFound(format!("localidentity {}", identity.name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PolicyScope, Subject};

    #[tokio::test]
    async fn test_policy_store() {
        let store = InMemoryPolicyStore::new();
        let policy = Policy::new("pol-x", "default", "Viewer", PolicyScope::Project);

        store.create(policy.clone()).await.unwrap();
        assert_eq!(store.get("pol-x").await.unwrap(), policy);
        assert!(store.get("pol-missing").await.unwrap_err().is_not_found());
        assert!(store.create(policy).await.unwrap_err().is_already_exists());

        assert_eq!(store.list("default").await.unwrap().len(), 1);
        assert!(store.list("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_binding_create_is_exclusive() {
        let store = InMemoryBindingStore::new();
        let binding = ProjectPolicy::empty("default", "proj-1", "pol-x");

        let created = store.create(binding.clone()).await.unwrap();
        assert_eq!(created.resource_version, 1);

        let err = store.create(binding).await.unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_binding_update_checks_version() {
        let store = InMemoryBindingStore::new();
        let created = store
            .create(ProjectPolicy::empty("default", "proj-1", "pol-x"))
            .await
            .unwrap();

        let mut first = created.clone();
        first.users.insert(Subject::new("usr-1", "alice"));
        let updated = store.update(first).await.unwrap();
        assert_eq!(updated.resource_version, 2);

        let mut stale = created;
        stale.users.insert(Subject::new("usr-2", "bob"));
        let err = store.update(stale).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let stored = store.get("proj-1-pol-x").await.unwrap();
        assert_eq!(stored.users.len(), 1);
    }

    #[tokio::test]
    async fn test_binding_update_missing() {
        let store = InMemoryBindingStore::new();
        let err = store
            .update(ProjectPolicy::empty("default", "proj-1", "pol-x"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_identity_store_filters() {
        let store = InMemoryIdentityStore::new();
        store.create(LocalIdentity::new("usr-1", "default", "alice")).await.unwrap();
        store.create(LocalIdentity::new("usr-2", "default", "bob")).await.unwrap();
        store.create(LocalIdentity::new("usr-3", "acme", "alice")).await.unwrap();

        let alice = store.list("default", "alice").await.unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].name, "usr-1");

        assert_eq!(store.list_tenant("default").await.unwrap().len(), 2);

        let mut updated = alice[0].clone();
        updated.display_name = "Alice".to_string();
        store.update(updated).await.unwrap();
        assert_eq!(store.get("usr-1").await.unwrap().display_name, "Alice");

        let err = store
            .update(LocalIdentity::new("usr-9", "default", "zed"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
