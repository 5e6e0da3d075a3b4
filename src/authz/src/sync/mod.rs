//! Declarative identity policy sync
//!
//! Identities may carry a declared policy list in an attribute slot. Syncing
//! computes the difference against what the evaluator currently grants and
//! binds or unbinds policies at the policy level until the two agree. The
//! slot is cleared before the remote calls, so a crash mid-sync loses the
//! declaration and the caller must supply it again.

pub mod binder;
pub mod engine;
pub mod slot;

pub use binder::{EvaluatorPolicyBinder, PolicyBinder};
pub use engine::{PolicySyncEngine, SyncOutcome};
pub use slot::{DeclaredPolicies, PolicyDisplayNames};

#[cfg(test)]
mod tests;
