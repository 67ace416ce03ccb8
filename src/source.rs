//! The data-source contract and the erased handle the runner works with.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future;

use crate::env::Env;
use crate::error::{FetchError, FetchResult};
use crate::value::{boxed, ValueBox};
use crate::BoxFut;

/// A comparable, hashable key selecting one requested item within a source
/// type. Together with the source name it forms the cache and deduplication
/// key; two `Source` leaves with equal `(source_name, identity)` pairs
/// resolve to the same fetched value.
///
/// Constructed from anything `Display`. The rendering must be deterministic
/// and stable for the lifetime of the source instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(Arc<str>);

impl Identity {
    /// Build an identity from a displayable key.
    pub fn new<K: fmt::Display>(key: K) -> Self {
        Self(Arc::from(key.to_string()))
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user-implemented remote data source.
///
/// An instance of a `DataSource` is a *description* of one item to fetch:
/// [`source_name`](DataSource::source_name) tags the concrete source type
/// (the batch-grouping and outer cache key) and
/// [`identity`](DataSource::identity) selects the item within it. The
/// instance lives inside a plan and is logically immutable; `Clone` exists
/// so the runner can assemble owned batches.
///
/// # Batching
///
/// [`fetch_multi`](DataSource::fetch_multi) has a default body that joins N
/// parallel [`fetch`](DataSource::fetch) calls, so implementing only `fetch`
/// opts out of batching. Sources that can satisfy several identities in one
/// round trip override it; the runner hands it every distinct uncached
/// identity of the group that is on the frontier at once.
///
/// `fetch` and `fetch_multi` may be invoked concurrently with other
/// invocations and are responsible for their own thread safety.
pub trait DataSource: Clone + Send + Sync + 'static {
    /// The fetched value type.
    type Value: Clone + Send + Sync + 'static;

    /// A stable string identifying the concrete source type.
    fn source_name(&self) -> &str;

    /// The identity of the requested item within this source type.
    fn identity(&self) -> Identity;

    /// Fetch the single item this instance describes.
    fn fetch(&self, env: Env) -> BoxFut<'static, FetchResult<Self::Value>>;

    /// Fetch a homogeneous batch in one call. The returned map must contain
    /// an entry for every identity in `batch`; missing entries fail the run
    /// with [`FetchError::BatchShape`](crate::FetchError::BatchShape).
    fn fetch_multi(
        batch: Vec<Self>,
        env: Env,
    ) -> BoxFut<'static, FetchResult<HashMap<Identity, Self::Value>>> {
        let fetches: Vec<_> = batch
            .into_iter()
            .map(|source| {
                let identity = source.identity();
                let fut = source.fetch(env.clone());
                async move { fut.await.map(|value| (identity, value)) }
            })
            .collect();

        Box::pin(async move {
            // Every single fetch runs to completion; a failure is reported
            // only after the join, discarding the sibling results.
            let mut values = HashMap::with_capacity(fetches.len());
            for result in future::join_all(fetches).await {
                let (identity, value) = result?;
                values.insert(identity, value);
            }
            Ok(values)
        })
    }
}

/// The source name of `source`, as used for the outer cache level. Exposed
/// for preconstructing seed caches; equals
/// [`DataSource::source_name`].
pub fn resource_name<S: DataSource>(source: &S) -> &str {
    source.source_name()
}

/// The cache key of `source` within its source type. Exposed for
/// preconstructing seed caches; equals [`DataSource::identity`].
pub fn cache_id<S: DataSource>(source: &S) -> Identity {
    source.identity()
}

/// Object-safe view of a [`DataSource`] with its value type erased. Plan
/// leaves hold these; the runner groups them by name and dispatches through
/// them without knowing the concrete type.
pub(crate) trait ErasedSource: Send + Sync + 'static {
    fn source_name(&self) -> &str;

    fn identity(&self) -> Identity;

    fn fetch(&self, env: Env) -> BoxFut<'static, FetchResult<ValueBox>>;

    /// Dispatch a batched fetch for `batch`, which must consist of handles
    /// to the same concrete type as `self`. Errs synchronously if it does
    /// not.
    fn fetch_multi(
        &self,
        batch: &[DynSource],
        env: Env,
    ) -> FetchResult<BoxFut<'static, FetchResult<HashMap<Identity, ValueBox>>>>;

    fn as_any(&self) -> &dyn Any;
}

/// Trait object [ErasedSource].
pub(crate) type DynSource = Arc<dyn ErasedSource>;

/// The wrapper that carries a concrete [`DataSource`] behind [`ErasedSource`].
pub(crate) struct SourceCell<S>(pub(crate) S);

impl<S: DataSource> ErasedSource for SourceCell<S> {
    fn source_name(&self) -> &str {
        self.0.source_name()
    }

    fn identity(&self) -> Identity {
        self.0.identity()
    }

    fn fetch(&self, env: Env) -> BoxFut<'static, FetchResult<ValueBox>> {
        let fut = self.0.fetch(env);
        Box::pin(async move { fut.await.map(boxed) })
    }

    fn fetch_multi(
        &self,
        batch: &[DynSource],
        env: Env,
    ) -> FetchResult<BoxFut<'static, FetchResult<HashMap<Identity, ValueBox>>>> {
        let mut concrete = Vec::with_capacity(batch.len());
        for peer in batch {
            let cell = peer
                .as_any()
                .downcast_ref::<SourceCell<S>>()
                .ok_or_else(|| FetchError::mixed_batch(self.0.source_name()))?;
            concrete.push(cell.0.clone());
        }

        let fut = S::fetch_multi(concrete, env);
        Ok(Box::pin(async move {
            fut.await.map(|values| {
                values
                    .into_iter()
                    .map(|(identity, value)| (identity, boxed(value)))
                    .collect()
            })
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
