//! Error types for plan execution.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::source::Identity;

/// The error reported by a failing data source, carried by
/// [`FetchError::Failed`].
///
/// Sources produce arbitrary error types; holding them as a shared trait
/// object keeps the whole `Result` clonable, which the runner relies on
/// when one fetch result fans out to several leaves of the plan.
#[derive(Clone, Default)]
pub struct DynSourceError(pub Option<Arc<dyn StdError + Send + Sync + 'static>>);

impl DynSourceError {
    /// Wrap a source error.
    pub fn new(err: impl StdError + Send + Sync + 'static) -> Self {
        Self(Some(Arc::new(err)))
    }
}

impl fmt::Debug for DynSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(err) => f.debug_tuple("Some").field(err).finish(),
            None => f.write_str("None"),
        }
    }
}

impl fmt::Display for DynSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(err) => err.fmt(f),
            None => f.write_str("None"),
        }
    }
}

impl StdError for DynSourceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.as_deref().map(|err| err as &dyn StdError)
    }
}

/// The fetchplan error type. Every failure mode of a run surfaces as one of
/// these variants in the rejection of the top-level future; nothing is
/// retried and there is no local recovery.
///
/// This type is required to implement `Clone` because fetch results are
/// shared between all the plan leaves that requested the same identity.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// A fetch or batched fetch rejected.
    #[error("fetch failed: {ctx} (src: {src})")]
    Failed {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynSourceError,
    },

    /// A batched fetch resolved, but its result is missing identities that
    /// were requested.
    #[error("batch response from source '{name}' is missing identities {missing:?}")]
    BatchShape {
        /// The source name of the offending group.
        name: Arc<str>,

        /// The requested identities absent from the response.
        missing: Vec<Identity>,
    },

    /// Two distinct concrete source types were found sharing one source
    /// name. Source names must map one-to-one onto concrete types.
    #[error("batch for source '{name}' mixed distinct concrete source types")]
    MixedBatch {
        /// The shared source name.
        name: Arc<str>,
    },

    /// An erased value failed to downcast to the type the plan expects.
    /// The usual cause is a seeded cache entry of the wrong type.
    #[error("value shape mismatch: {ctx}")]
    ValueShape {
        /// What was expected, and where.
        ctx: Arc<str>,
    },

    /// An iteration of the runner completed without resolving any source,
    /// expanding any bind, or collapsing any combinator. Indicates a
    /// misbehaving data source or a stale cache seed.
    #[error("run stalled: an iteration made no progress")]
    Stalled,

    /// The executor failed to produce a result for a scheduled fetch.
    #[error("executor failure: {ctx}")]
    Executor {
        /// Any context associated with this error.
        ctx: Arc<str>,
    },
}

impl FetchError {
    /// A fetch failure wrapping the error the source reported.
    pub fn failed_src(ctx: impl fmt::Display, src: impl StdError + Send + Sync + 'static) -> Self {
        Self::Failed {
            ctx: Arc::from(ctx.to_string()),
            src: DynSourceError::new(src),
        }
    }

    /// A fetch failure from a bare message.
    pub fn failed(ctx: impl fmt::Display) -> Self {
        Self::Failed {
            ctx: Arc::from(ctx.to_string()),
            src: DynSourceError::default(),
        }
    }

    pub(crate) fn value_shape(ctx: impl fmt::Display) -> Self {
        Self::ValueShape {
            ctx: Arc::from(ctx.to_string()),
        }
    }

    pub(crate) fn mixed_batch(name: &str) -> Self {
        Self::MixedBatch {
            name: Arc::from(name),
        }
    }

    pub(crate) fn batch_shape(name: Arc<str>, missing: Vec<Identity>) -> Self {
        Self::BatchShape { name, missing }
    }

    pub(crate) fn executor(ctx: impl fmt::Display) -> Self {
        Self::Executor {
            ctx: Arc::from(ctx.to_string()),
        }
    }
}

/// The fetchplan result type.
pub type FetchResult<T> = Result<T, FetchError>;
