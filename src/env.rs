//! The opaque per-run environment.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A single opaque value supplied per run and passed unchanged to every
/// fetch. The core never interprets it; data sources downcast it to
/// whatever they agreed on with the caller (a connection pool, a request
/// context, credentials).
///
/// `Env` is a cheap clone (one `Arc`), so fetch implementations can move
/// copies of it into their futures freely.
#[derive(Clone, Default)]
pub struct Env(Option<Arc<dyn Any + Send + Sync>>);

impl Env {
    /// Wrap a value as the run environment.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    /// The absent environment. Equivalent to `Env::default()`.
    pub fn none() -> Self {
        Self(None)
    }

    /// Borrow the environment as a `T`, if one was supplied and the type
    /// matches.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|inner| inner.downcast_ref())
    }

    /// Whether an environment value was supplied.
    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => f.write_str("Env(None)"),
            Some(_) => f.write_str("Env(<opaque>)"),
        }
    }
}
