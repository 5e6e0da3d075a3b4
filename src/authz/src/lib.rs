//! # Polbind Authorization Binding Engine
//!
//! Keeps subject-to-policy bindings consistent across projects and an RBAC
//! evaluator.
//!
//! ## Features
//!
//! - **Project bindings** with one record per (project, policy), created lazily
//! - **Race-safe first bind** through atomic create with read fallback
//! - **Declarative identity sync** converging evaluator grants with a declared list
//! - **Casbin-backed evaluator** using an RBAC-with-domains model
//! - **Pluggable stores** with in-memory defaults and an optional PostgreSQL binding store
//!
//! ## Example
//!
//! ```rust
//! use polbind_authz::{
//!     BindingReconciler, BindingRequest, BindingSubjects, EngineConfig, Policy, PolicyScope,
//!     RequestContext, Subject,
//! };
//! use polbind_authz::store::{InMemoryBindingStore, InMemoryPolicyStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let policies = Arc::new(InMemoryPolicyStore::with_policies(vec![Policy::new(
//!         "pol-x",
//!         "default",
//!         "Viewer",
//!         PolicyScope::Project,
//!     )]));
//!     let bindings = Arc::new(InMemoryBindingStore::new());
//!     let reconciler = BindingReconciler::new(policies, bindings, &EngineConfig::default());
//!
//!     let request = BindingRequest::new(
//!         "pol-x",
//!         BindingSubjects::users(vec![Subject::new("usr-1", "alice")]),
//!     );
//!     let binding = reconciler.bind(&RequestContext::new("proj-1"), &request).await?;
//!
//!     assert_eq!(binding.name, "proj-1-pol-x");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod evaluator;
pub mod identity;
pub mod keys;
pub mod reconciler;
pub mod scope;
pub mod store;
pub mod subjects;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{BindingError, Result, SyncFailure, SyncFailures, SyncPhase};
pub use evaluator::{CasbinEvaluator, Evaluator};
pub use identity::{get_local_identity, IdentityService};
pub use reconciler::BindingReconciler;
pub use scope::{RequestContext, ScopeResolver};
pub use subjects::{SubjectKey, SubjectSet};
pub use sync::{EvaluatorPolicyBinder, PolicyBinder, PolicySyncEngine, SyncOutcome};
pub use types::{
    BindingRequest, BindingSubjects, LocalIdentity, Policy, PolicyId, PolicyScope, ProjectId,
    ProjectPolicy, Subject, TenantId,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
