/// Request context supplied by the transport layer

use serde::{Deserialize, Serialize};

/// What the transport knows about the addressed scope
///
/// # Examples
///
/// ```
/// use polbind_authz::scope::RequestContext;
///
/// let ctx = RequestContext::new("proj-1");
/// assert_eq!(ctx.hint(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Scope explicitly selected by the caller (e.g. a project header)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_hint: Option<String>,

    /// Name taken from the request addressing (e.g. the path segment)
    #[serde(default)]
    pub fallback_name: String,
}

impl RequestContext {
    /// Context with only a path-derived name
    pub fn new(fallback_name: impl Into<String>) -> Self {
        Self {
            scope_hint: None,
            fallback_name: fallback_name.into(),
        }
    }

    /// Attach an explicit scope hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.scope_hint = Some(hint.into());
        self
    }

    /// The hint, if non-empty
    pub fn hint(&self) -> Option<&str> {
        self.scope_hint
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }
}
