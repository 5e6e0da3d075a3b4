/// Project scope resolution for bind/unbind requests
///
/// The effective project of a request is the transport-supplied hint when
/// present, otherwise the name addressed by the request path. Policies are
/// checked against the scope kind the resolver operates in before anything
/// is written.
///
/// # Examples
///
/// ```
/// use polbind_authz::scope::{RequestContext, ScopeResolver};
///
/// let resolver = ScopeResolver::new();
/// let ctx = RequestContext::new("proj-from-path").with_hint("proj-from-header");
///
/// assert_eq!(resolver.effective_scope(&ctx).unwrap(), "proj-from-header");
/// ```

mod types;
mod resolver;


pub use types::RequestContext;
pub use resolver::ScopeResolver;
