//! The erased value slot that heterogeneous results travel through.

use std::any::{type_name, Any};
use std::sync::Arc;

use crate::error::{FetchError, FetchResult};

/// An erased, shareable value. Fetched results are stored in the cache and
/// planted into plan leaves in this form; the typed [`Plan`](crate::Plan)
/// facade downcasts at the seams.
pub type ValueBox = Arc<dyn Any + Send + Sync>;

pub(crate) fn boxed<T: Send + Sync + 'static>(value: T) -> ValueBox {
    Arc::new(value)
}

/// Extract an owned `T`. Takes the value out when this is the only handle,
/// clones otherwise (the same cached value can be planted into several
/// leaves).
pub(crate) fn unboxed<T: Clone + Send + Sync + 'static>(value: ValueBox) -> FetchResult<T> {
    match value.downcast::<T>() {
        Ok(arc) => Ok(Arc::try_unwrap(arc).unwrap_or_else(|shared| (*shared).clone())),
        Err(_) => Err(FetchError::value_shape(format!(
            "expected a value of type {}",
            type_name::<T>()
        ))),
    }
}
