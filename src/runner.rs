//! The runner: alternates frontier extraction and batched dispatch until
//! the plan collapses to a value.

use std::collections::HashMap;
use std::sync::Arc;

use futures::channel::oneshot;
use futures::future;

use crate::cache::Cache;
use crate::env::Env;
use crate::error::{FetchError, FetchResult};
use crate::executor::{default_executor, DynExecutor};
use crate::frontier::{self, Group};
use crate::plan::{Node, Plan};
use crate::plant;
use crate::source::{DynSource, Identity};
use crate::value::{unboxed, ValueBox};
use crate::BoxFut;

/// Options recognized by [`run`] and [`execute`].
#[derive(Default)]
pub struct RunOptions {
    /// Opaque value threaded unchanged to every fetch. Default: none.
    pub env: Env,

    /// Seed cache; items present in it are never fetched. Default: empty.
    pub cache: Cache,

    /// Scheduler for fetch work. Default: a fresh
    /// [`ThreadPool`](futures::executor::ThreadPool).
    pub executor: Option<DynExecutor>,
}

/// Run a plan to its value.
pub async fn run<T>(plan: Plan<T>, options: RunOptions) -> FetchResult<T>
where
    T: Clone + Send + Sync + 'static,
{
    execute(plan, options).await.map(|(value, _cache)| value)
}

/// Run a plan on the calling thread, blocking until it resolves.
pub fn run_blocking<T>(plan: Plan<T>, options: RunOptions) -> FetchResult<T>
where
    T: Clone + Send + Sync + 'static,
{
    futures::executor::block_on(run(plan, options))
}

/// Run a plan to its value and the final cache.
///
/// Each iteration takes the *whole* current frontier before dispatching
/// anything, which is what guarantees that product siblings are
/// co-dispatched, that every identity is fetched at most once per run, and
/// that a bind is the only barrier splitting the run into phases. All
/// fetches of one iteration run concurrently; the iteration's join is the
/// sole suspension point.
pub async fn execute<T>(plan: Plan<T>, options: RunOptions) -> FetchResult<(T, Cache)>
where
    T: Clone + Send + Sync + 'static,
{
    let RunOptions {
        env,
        mut cache,
        executor,
    } = options;

    let executor = match executor {
        Some(executor) => executor,
        None => default_executor()?,
    };

    let mut node = plan.node;
    let mut iteration = 0usize;

    loop {
        if let Node::Value(value) = node {
            tracing::debug!("plan resolved after {iteration} iteration(s)");
            return Ok((unboxed::<T>(value)?, cache));
        }

        iteration += 1;
        let groups = frontier::analyze(&node);
        tracing::trace!("iteration {iteration}: {} frontier group(s)", groups.len());

        let mut pending = Vec::new();
        for Group { name, sources } in groups {
            let misses: Vec<DynSource> = sources
                .into_iter()
                .filter(|source| !cache.contains(&name, &source.identity()))
                .collect();

            // Cache hits are consumed by the planting pass below.
            if misses.is_empty() {
                continue;
            }

            pending.push(dispatch_group(&executor, name, misses, env.clone())?);
        }

        // The sole suspension point of the iteration. Every dispatched
        // fetch is allowed to complete even if a sibling fails; a failure
        // rejects the run after the join, discarding the other results.
        let outcomes = future::join_all(pending.into_iter().map(wait_group)).await;

        let mut first_error = None;
        for outcome in outcomes {
            if let Err(err) = merge_group(&mut cache, outcome) {
                first_error.get_or_insert(err);
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        let pass = plant::plant(node, &cache)?;
        if !pass.progressed() {
            tracing::warn!("iteration {iteration} resolved nothing; failing the run");
            return Err(FetchError::Stalled);
        }
        node = pass.node;
    }
}

struct PendingGroup {
    name: Arc<str>,
    requested: Vec<Identity>,
    rx: oneshot::Receiver<FetchResult<HashMap<Identity, ValueBox>>>,
}

/// Schedule the fetch work for one frontier group on the executor: a plain
/// single-item fetch for one miss, a batched fetch for two or more.
fn dispatch_group(
    executor: &DynExecutor,
    name: Arc<str>,
    mut misses: Vec<DynSource>,
    env: Env,
) -> FetchResult<PendingGroup> {
    let requested: Vec<Identity> = misses.iter().map(|source| source.identity()).collect();

    let fut: BoxFut<'static, FetchResult<HashMap<Identity, ValueBox>>> = match misses.pop() {
        None => Box::pin(async move { Ok(HashMap::new()) }),
        Some(only) if misses.is_empty() => {
            let identity = only.identity();
            tracing::debug!("dispatching single fetch '{name}/{identity}'");
            let fetch = only.fetch(env);
            Box::pin(async move { fetch.await.map(|value| HashMap::from([(identity, value)])) })
        }
        Some(last) => {
            misses.push(last);
            tracing::debug!(
                "dispatching batched fetch of {} identities for source '{name}'",
                misses.len()
            );
            misses[0].fetch_multi(&misses, env)?
        }
    };

    let (tx, rx) = oneshot::channel();
    executor.execute(Box::pin(async move {
        // The receiver is gone only if the whole run was dropped.
        let _ = tx.send(fut.await);
    }));

    Ok(PendingGroup {
        name,
        requested,
        rx,
    })
}

async fn wait_group(
    group: PendingGroup,
) -> (
    Arc<str>,
    Vec<Identity>,
    FetchResult<HashMap<Identity, ValueBox>>,
) {
    let PendingGroup {
        name,
        requested,
        rx,
    } = group;

    let result = match rx.await {
        Ok(result) => result,
        Err(oneshot::Canceled) => Err(FetchError::executor(format!(
            "scheduled fetch for source '{name}' was dropped before completing"
        ))),
    };

    (name, requested, result)
}

/// Merge one group's results into the cache. Every requested identity must
/// be present; identities that were returned but not requested are
/// discarded, not cached.
fn merge_group(
    cache: &mut Cache,
    (name, requested, result): (
        Arc<str>,
        Vec<Identity>,
        FetchResult<HashMap<Identity, ValueBox>>,
    ),
) -> FetchResult<()> {
    let mut values = result?;

    let missing: Vec<Identity> = requested
        .iter()
        .filter(|identity| !values.contains_key(identity))
        .cloned()
        .collect();
    if !missing.is_empty() {
        tracing::warn!(
            "batch response from source '{name}' is missing {} requested identities",
            missing.len()
        );
        return Err(FetchError::batch_shape(name, missing));
    }

    for identity in requested {
        if let Some(value) = values.remove(&identity) {
            cache.insert(&name, identity, value);
        }
    }

    if !values.is_empty() {
        tracing::warn!(
            "discarding {} unrequested identities returned by source '{name}'",
            values.len()
        );
    }

    Ok(())
}
