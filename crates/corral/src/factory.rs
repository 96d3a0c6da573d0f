//! Factory capability set for creating, validating, and destroying resources.

use std::future::Future;

use crate::error::BoxError;

/// User-supplied lifecycle callbacks for one resource type.
///
/// The pool invokes these outside its critical sections, so implementations
/// are free to take as long as they need. Failures never unwind through the
/// pool: a `create` error is routed to the acquire it was earmarked for, and
/// a `destroy` error is logged and swallowed (the record is removed from the
/// pool regardless, so `destroy` must tolerate already-dead resources).
///
/// `validate` is an optional cheap health probe; the default accepts
/// everything. It is only consulted when `test_on_borrow` or
/// `test_on_return` is configured.
pub trait Factory: Send + Sync + 'static {
    /// The resource type produced by this factory.
    type Resource: Send + 'static;

    /// Short identifier used in diagnostics (e.g. "postgres", "smtp").
    fn id(&self) -> &str;

    /// Produce a fresh resource.
    fn create(&self) -> impl Future<Output = Result<Self::Resource, BoxError>> + Send;

    /// Release a resource permanently. Must be idempotent against inputs
    /// that are already dead.
    fn destroy(&self, resource: Self::Resource) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Check whether an existing resource is still healthy.
    fn validate(&self, resource: &Self::Resource) -> impl Future<Output = bool> + Send {
        let _ = resource;
        std::future::ready(true)
    }
}
