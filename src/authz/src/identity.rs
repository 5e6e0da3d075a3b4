//! Local identity hooks
//!
//! Identity writes trigger a policy sync; identity reads come back with the
//! display names of their granted policies in the policies slot.

use crate::error::{BindingError, Result};
use crate::store::IdentityStore;
use crate::sync::{PolicySyncEngine, SyncOutcome};
use crate::types::LocalIdentity;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// First identity of `tenant_id` named `username`
pub async fn get_local_identity(
    store: &dyn IdentityStore,
    tenant_id: &str,
    username: &str,
) -> Result<LocalIdentity> {
    store
        .list(tenant_id, username)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| BindingError::IdentityNotFound(format!("{}/{}", tenant_id, username)))
}

pub struct IdentityService {
    store: Arc<dyn IdentityStore>,
    sync: Arc<PolicySyncEngine>,
}

impl IdentityService {
    pub fn new(store: Arc<dyn IdentityStore>, sync: Arc<PolicySyncEngine>) -> Self {
        Self { store, sync }
    }

    /// Store the identity with its slot cleared, then sync declared policies
    ///
    /// A rejected create grants nothing. Once stored, the identity stays
    /// even when some binds or unbinds failed; the aggregate failure is
    /// returned afterwards.
    #[instrument(skip(self, identity), fields(identity = %identity.name))]
    pub async fn create(&self, mut identity: LocalIdentity) -> Result<LocalIdentity> {
        let mut record = identity.clone();
        record.extra.remove(&self.sync.config().policies_key);
        let created = self.store.create(record).await?;
        info!(user = %created.username, tenant = %created.tenant_id, "created local identity");

        let synced = self.sync.sync_identity_policies(&mut identity).await;
        finish(created, synced)
    }

    /// As [`create`](Self::create) for an existing identity
    #[instrument(skip(self, identity), fields(identity = %identity.name))]
    pub async fn update(&self, mut identity: LocalIdentity) -> Result<LocalIdentity> {
        let existing = self.store.get(&identity.name).await.map_err(|e| {
            if e.is_not_found() {
                BindingError::IdentityNotFound(identity.name.clone())
            } else {
                e.into()
            }
        })?;
        // tenant and username key the evaluator subject
        identity.tenant_id = existing.tenant_id;
        identity.username = existing.username;

        let synced = self.sync.sync_identity_policies(&mut identity).await;
        let updated = self.store.update(identity).await?;
        finish(updated, synced)
    }

    pub async fn get(&self, tenant_id: &str, username: &str) -> Result<LocalIdentity> {
        let mut identity = get_local_identity(self.store.as_ref(), tenant_id, username).await?;
        self.sync
            .fill_policy_display_names(std::slice::from_mut(&mut identity))
            .await;
        Ok(identity)
    }

    /// Identities of a tenant, optionally narrowed to one username
    pub async fn list(&self, tenant_id: &str, username: Option<&str>) -> Result<Vec<LocalIdentity>> {
        let mut identities = match username {
            Some(username) => self.store.list(tenant_id, username).await?,
            None => self.store.list_tenant(tenant_id).await?,
        };
        self.sync.fill_policy_display_names(&mut identities).await;
        Ok(identities)
    }
}

fn finish(identity: LocalIdentity, synced: Result<SyncOutcome>) -> Result<LocalIdentity> {
    match synced {
        Ok(_) => Ok(identity),
        Err(e) => {
            warn!(identity = %identity.name, error = %e, "identity stored with unsynced policies");
            Err(e)
        }
    }
}
