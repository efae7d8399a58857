//! Type-erased component handles.
//!
//! Every produced component travels through the engine as an [`Instance`]:
//! an `Arc<dyn Any>` whose payload is the shared handle `Arc<I>` for some
//! view `I` (a concrete type or a bound trait object). Packing the `Arc<I>`
//! itself, rather than the value, is what lets trait-object views live in
//! the same registry as concrete ones.

use std::any::Any;
use std::sync::Arc;

/// Shared, type-erased component handle. Payload is always an `Arc<I>`.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Erase a typed handle into an [`Instance`].
pub fn pack<I: ?Sized + Send + Sync + 'static>(handle: Arc<I>) -> Instance {
    Arc::new(handle)
}

/// Recover the typed handle. Returns `None` when the payload is a handle of
/// a different view.
pub fn unpack<I: ?Sized + Send + Sync + 'static>(instance: &Instance) -> Option<Arc<I>> {
    instance.downcast_ref::<Arc<I>>().map(Arc::clone)
}
