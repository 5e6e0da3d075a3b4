/// Test suite for identity policy sync
///
/// Tests cover:
/// - Declared vs granted difference
/// - Failure aggregation across bind and unbind
/// - Display name memoization
use super::*;
use crate::config::EngineConfig;
use crate::error::{BindingError, Result, SyncPhase};
use crate::evaluator::Evaluator;
use crate::store::{InMemoryPolicyStore, PolicyStore, StoreResult};
use crate::types::{BindingSubjects, LocalIdentity, Policy, PolicyScope, RoleId, Subject};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Test doubles
// ============================================================================

/// Evaluator answering from a fixed role table, recording the queried domains
#[derive(Default)]
struct ScriptedEvaluator {
    roles: HashMap<String, Vec<RoleId>>,
    domains: Mutex<Vec<String>>,
}

impl ScriptedEvaluator {
    fn with_roles(mut self, subject_key: &str, roles: &[&str]) -> Self {
        self.roles
            .insert(subject_key.to_string(), roles.iter().map(|r| r.to_string()).collect());
        self
    }
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
    async fn roles_reachable(&self, subject_key: &str, domain: &str) -> Vec<RoleId> {
        self.domains.lock().unwrap().push(domain.to_string());
        self.roles.get(subject_key).cloned().unwrap_or_default()
    }
}

/// Binder recording every call, failing for selected policies
#[derive(Default)]
struct RecordingBinder {
    calls: Mutex<Vec<(SyncPhase, String, BindingSubjects)>>,
    failing: HashSet<String>,
}

impl RecordingBinder {
    fn failing_on(policy_id: &str) -> Self {
        Self {
            failing: HashSet::from([policy_id.to_string()]),
            ..Default::default()
        }
    }

    fn calls(&self, phase: SyncPhase) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _, _)| *p == phase)
            .map(|(_, id, _)| id.clone())
            .collect()
    }

    fn record(&self, phase: SyncPhase, policy_id: &str, subjects: &BindingSubjects) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((phase, policy_id.to_string(), subjects.clone()));
        if self.failing.contains(policy_id) {
            return Err(BindingError::Evaluator(format!("{} rejected", policy_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl PolicyBinder for RecordingBinder {
    async fn bind(&self, policy_id: &str, subjects: &BindingSubjects) -> Result<()> {
        self.record(SyncPhase::Bind, policy_id, subjects)
    }

    async fn unbind(&self, policy_id: &str, subjects: &BindingSubjects) -> Result<()> {
        self.record(SyncPhase::Unbind, policy_id, subjects)
    }
}

/// Policy store counting lookups per id
struct CountingPolicyStore {
    inner: InMemoryPolicyStore,
    lookups: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl CountingPolicyStore {
    fn new(policies: Vec<Policy>) -> Self {
        Self {
            inner: InMemoryPolicyStore::with_policies(policies),
            lookups: Mutex::new(HashMap::new()),
            total: AtomicUsize::new(0),
        }
    }

    fn lookups_of(&self, id: &str) -> usize {
        self.lookups.lock().unwrap().get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl PolicyStore for CountingPolicyStore {
    async fn get(&self, id: &str) -> StoreResult<Policy> {
        *self.lookups.lock().unwrap().entry(id.to_string()).or_default() += 1;
        self.total.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id).await
    }

    async fn create(&self, policy: Policy) -> StoreResult<Policy> {
        self.inner.create(policy).await
    }

    async fn list(&self, tenant_id: &str) -> StoreResult<Vec<Policy>> {
        self.inner.list(tenant_id).await
    }
}

fn policies() -> Vec<Policy> {
    vec![
        Policy::new("pol-a", "default", "Viewer", PolicyScope::Platform),
        Policy::new("pol-b", "default", "Editor", PolicyScope::Platform),
        Policy::new("pol-c", "default", "Auditor", PolicyScope::Platform),
    ]
}

fn engine(
    evaluator: ScriptedEvaluator,
    binder: Arc<RecordingBinder>,
    config: EngineConfig,
) -> PolicySyncEngine {
    PolicySyncEngine::new(
        Arc::new(evaluator),
        binder,
        Arc::new(InMemoryPolicyStore::with_policies(policies())),
        config,
    )
}

fn alice() -> LocalIdentity {
    LocalIdentity::new("usr-1", "default", "alice")
}

// ============================================================================
// Sync Tests
// ============================================================================

#[tokio::test]
async fn test_no_declaration_is_noop() {
    let binder = Arc::new(RecordingBinder::default());
    let evaluator = ScriptedEvaluator::default().with_roles("default##user##alice", &["pol-a"]);
    let engine = engine(evaluator, binder.clone(), EngineConfig::default());

    let mut identity = alice();
    let outcome = engine.sync_identity_policies(&mut identity).await.unwrap();

    assert_eq!(outcome, SyncOutcome::NothingToDo);
    assert!(binder.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_binds_added_and_unbinds_removed() {
    let binder = Arc::new(RecordingBinder::default());
    let evaluator =
        ScriptedEvaluator::default().with_roles("default##user##alice", &["pol-b", "pol-c", "rol-x"]);
    let engine = engine(evaluator, binder.clone(), EngineConfig::default());

    let mut identity = alice().with_extra("policies", "pol-a, pol-b");
    let outcome = engine.sync_identity_policies(&mut identity).await.unwrap();

    assert_eq!(
        outcome,
        SyncOutcome::Converged {
            added: vec!["pol-a".to_string()],
            removed: vec!["pol-c".to_string()],
        }
    );
    assert_eq!(binder.calls(SyncPhase::Bind), vec!["pol-a"]);
    assert_eq!(binder.calls(SyncPhase::Unbind), vec!["pol-c"]);
    assert!(!identity.extra.contains_key("policies"));
}

#[tokio::test]
async fn test_sync_binds_identity_as_user_subject() {
    let binder = Arc::new(RecordingBinder::default());
    let engine = engine(ScriptedEvaluator::default(), binder.clone(), EngineConfig::default());

    let mut identity = alice().with_extra("policies", "pol-a");
    engine.sync_identity_policies(&mut identity).await.unwrap();

    let calls = binder.calls.lock().unwrap();
    let (_, _, subjects) = &calls[0];
    assert_eq!(subjects.users, vec![Subject::new("usr-1", "alice")]);
    assert!(subjects.groups.is_empty());
}

#[tokio::test]
async fn test_empty_declaration_unbinds_everything() {
    let binder = Arc::new(RecordingBinder::default());
    let evaluator = ScriptedEvaluator::default().with_roles("default##user##alice", &["pol-a", "pol-b"]);
    let engine = engine(evaluator, binder.clone(), EngineConfig::default());

    let mut identity = alice().with_extra("policies", "");
    engine.sync_identity_policies(&mut identity).await.unwrap();

    assert!(binder.calls(SyncPhase::Bind).is_empty());
    assert_eq!(binder.calls(SyncPhase::Unbind), vec!["pol-a", "pol-b"]);
}

#[tokio::test]
async fn test_failures_are_aggregated_and_not_retried() {
    let binder = Arc::new(RecordingBinder::failing_on("pol-a"));
    let evaluator = ScriptedEvaluator::default().with_roles("default##user##alice", &["pol-b", "pol-c"]);
    let engine = engine(evaluator, binder.clone(), EngineConfig::default());

    let mut identity = alice().with_extra("policies", "pol-a,pol-b");
    let err = engine.sync_identity_policies(&mut identity).await.unwrap_err();

    match err {
        BindingError::PartialSyncFailure(failures) => {
            assert_eq!(failures.len(), 1);
            let failure = failures.iter().next().unwrap();
            assert_eq!(failure.policy_id, "pol-a");
            assert_eq!(failure.phase, SyncPhase::Bind);
        }
        other => panic!("expected PartialSyncFailure, got {:?}", other),
    }
    assert_eq!(binder.calls(SyncPhase::Bind), vec!["pol-a"]);
    assert_eq!(binder.calls(SyncPhase::Unbind), vec!["pol-c"]);
    assert!(!identity.extra.contains_key("policies"));
}

#[tokio::test]
async fn test_failures_from_both_phases_reported() {
    let binder = Arc::new(RecordingBinder {
        failing: HashSet::from(["pol-a".to_string(), "pol-c".to_string()]),
        ..Default::default()
    });
    let evaluator = ScriptedEvaluator::default().with_roles("default##user##alice", &["pol-c"]);
    let engine = engine(evaluator, binder, EngineConfig::default());

    let mut identity = alice().with_extra("policies", "pol-a");
    let err = engine.sync_identity_policies(&mut identity).await.unwrap_err();

    let BindingError::PartialSyncFailure(failures) = err else {
        panic!("expected PartialSyncFailure");
    };
    assert_eq!(failures.in_phase(SyncPhase::Bind).count(), 1);
    assert_eq!(failures.in_phase(SyncPhase::Unbind).count(), 1);
    let rendered = failures.to_string();
    assert!(rendered.contains("pol-a"));
    assert!(rendered.contains("pol-c"));
}

#[tokio::test]
async fn test_configured_domain_and_key() {
    let binder = Arc::new(RecordingBinder::default());
    let evaluator = Arc::new(ScriptedEvaluator::default());
    let config = EngineConfig {
        policies_key: "grants".to_string(),
        ..EngineConfig::default()
    }
    .with_evaluator_domain("tenant-a");
    let engine = PolicySyncEngine::new(
        evaluator.clone(),
        binder.clone(),
        Arc::new(InMemoryPolicyStore::with_policies(policies())),
        config,
    );

    let mut identity = alice()
        .with_extra("policies", "pol-b")
        .with_extra("grants", "pol-a");
    engine.sync_identity_policies(&mut identity).await.unwrap();

    assert_eq!(binder.calls(SyncPhase::Bind), vec!["pol-a"]);
    assert_eq!(identity.extra.get("policies").map(String::as_str), Some("pol-b"));
    assert_eq!(*evaluator.domains.lock().unwrap(), vec!["tenant-a"]);
}

// ============================================================================
// Display Name Tests
// ============================================================================

#[tokio::test]
async fn test_display_names_memoized_per_call() {
    let evaluator = ScriptedEvaluator::default()
        .with_roles("default##user##alice", &["pol-a"])
        .with_roles("default##user##bob", &["pol-a", "pol-b"])
        .with_roles("default##user##carol", &["pol-a", "rol-x"]);
    let store = Arc::new(CountingPolicyStore::new(policies()));
    let engine = PolicySyncEngine::new(
        Arc::new(evaluator),
        Arc::new(RecordingBinder::default()),
        store.clone(),
        EngineConfig::default(),
    );

    let mut identities = vec![
        LocalIdentity::new("usr-1", "default", "alice"),
        LocalIdentity::new("usr-2", "default", "bob"),
        LocalIdentity::new("usr-3", "default", "carol"),
    ];
    engine.fill_policy_display_names(&mut identities).await;

    assert_eq!(store.lookups_of("pol-a"), 1);
    assert_eq!(store.lookups_of("pol-b"), 1);
    assert_eq!(store.total.load(Ordering::SeqCst), 2);

    let bob = PolicyDisplayNames::from_slot_value(&identities[1].extra["policies"]).unwrap();
    assert_eq!(bob.get("pol-a"), Some("Viewer"));
    assert_eq!(bob.get("pol-b"), Some("Editor"));
}

#[tokio::test]
async fn test_memo_not_shared_across_calls() {
    let evaluator = ScriptedEvaluator::default().with_roles("default##user##alice", &["pol-a"]);
    let store = Arc::new(CountingPolicyStore::new(policies()));
    let engine = PolicySyncEngine::new(
        Arc::new(evaluator),
        Arc::new(RecordingBinder::default()),
        store.clone(),
        EngineConfig::default(),
    );

    engine.fill_policy_display_names(&mut [alice()]).await;
    engine.fill_policy_display_names(&mut [alice()]).await;

    assert_eq!(store.lookups_of("pol-a"), 2);
}

#[tokio::test]
async fn test_failed_lookup_skipped() {
    let evaluator = ScriptedEvaluator::default()
        .with_roles("default##user##alice", &["pol-gone", "pol-a"])
        .with_roles("default##user##bob", &["pol-gone"]);
    let store = Arc::new(CountingPolicyStore::new(policies()));
    let engine = PolicySyncEngine::new(
        Arc::new(evaluator),
        Arc::new(RecordingBinder::default()),
        store.clone(),
        EngineConfig::default(),
    );

    let mut identities = vec![alice(), LocalIdentity::new("usr-2", "default", "bob")];
    engine.fill_policy_display_names(&mut identities).await;

    let alice_names = PolicyDisplayNames::from_slot_value(&identities[0].extra["policies"]).unwrap();
    assert_eq!(alice_names.len(), 1);
    assert_eq!(alice_names.get("pol-a"), Some("Viewer"));
    assert_eq!(identities[1].extra["policies"], "{}");
    // failures are not memoized
    assert_eq!(store.lookups_of("pol-gone"), 2);
}
