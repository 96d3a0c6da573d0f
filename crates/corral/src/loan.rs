//! RAII handle for a borrowed resource.

use std::ops::{Deref, DerefMut};
use std::sync::Weak;

use tokio::time::Instant;

use crate::factory::Factory;
use crate::pool::Shared;
use crate::record::RecordId;

/// RAII handle for a resource on loan from a [`Pool`](crate::Pool).
///
/// Dereferences to the resource. Dropping the loan returns the resource to
/// the pool; [`Pool::release`](crate::Pool::release) does the same
/// explicitly, and [`Pool::destroy`](crate::Pool::destroy) force-retires the
/// resource instead. Use [`Loan::detach`] to take the resource out of the
/// pool's management entirely.
pub struct Loan<F: Factory> {
    parts: Option<(RecordId, F::Resource)>,
    shared: Weak<Shared<F>>,
    acquired_at: Instant,
}

impl<F: Factory> Loan<F> {
    pub(crate) fn new(shared: Weak<Shared<F>>, record: RecordId, resource: F::Resource) -> Self {
        Self {
            parts: Some((record, resource)),
            shared,
            acquired_at: Instant::now(),
        }
    }

    /// Take the resource out of the loan without triggering return or
    /// destruction on drop. Used by the force-retire path.
    pub(crate) fn into_parts(mut self) -> (RecordId, F::Resource) {
        self.parts.take().expect("loan used after detach")
    }

    /// Detach the resource from the pool.
    ///
    /// The pool forgets the resource and frees its slot; the caller becomes
    /// responsible for tearing the resource down. The factory's `destroy` is
    /// never invoked for a detached resource.
    #[must_use]
    pub fn detach(mut self) -> F::Resource {
        let (record, resource) = self.parts.take().expect("loan used after detach");
        if let Some(shared) = self.shared.upgrade() {
            shared.detach_record(record);
        }
        resource
    }
}

impl<F: Factory> Deref for Loan<F> {
    type Target = F::Resource;

    fn deref(&self) -> &F::Resource {
        &self.parts.as_ref().expect("loan used after detach").1
    }
}

impl<F: Factory> DerefMut for Loan<F> {
    fn deref_mut(&mut self) -> &mut F::Resource {
        &mut self.parts.as_mut().expect("loan used after detach").1
    }
}

impl<F: Factory> Drop for Loan<F> {
    fn drop(&mut self) {
        if let Some((record, resource)) = self.parts.take() {
            if let Some(shared) = self.shared.upgrade() {
                shared.release_parts(record, resource, self.acquired_at);
            }
        }
    }
}

impl<F: Factory> std::fmt::Debug for Loan<F>
where
    F::Resource: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loan")
            .field("resource", &self.parts.as_ref().map(|(_, r)| r))
            .finish()
    }
}
