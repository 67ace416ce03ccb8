//! The two-level fetch cache: source name → (identity → resolved value).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::source::{cache_id, resource_name, DataSource, Identity};
use crate::value::{boxed, unboxed, ValueBox};

/// Resolved fetch results, keyed by `(source_name, identity)`.
///
/// A cache is created (or seeded) at the start of a run, grows
/// monotonically while the run executes (keys are never removed), and is
/// returned alongside the result by [`execute`](crate::execute). Seeding a
/// cache with known values elides the corresponding fetches entirely.
///
/// The outer level is deliberately the source name rather than a composite
/// key: it is the same pivot the runner batches on.
#[derive(Clone, Default)]
pub struct Cache {
    entries: HashMap<Arc<str>, HashMap<Identity, ValueBox>>,
}

impl Cache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value for the item `source` describes, as if it had been
    /// fetched. Uses [`resource_name`] and [`cache_id`] for the key.
    pub fn seed<S: DataSource>(&mut self, source: &S, value: S::Value) {
        self.insert(resource_name(source), cache_id(source), boxed(value));
    }

    /// Look up the seeded or fetched value for the item `source` describes.
    pub fn get<S: DataSource>(&self, source: &S) -> Option<S::Value> {
        let value = self.lookup(resource_name(source), &cache_id(source))?;
        unboxed(value.clone()).ok()
    }

    /// Look up an erased value by source name and identity.
    pub fn lookup(&self, name: &str, identity: &Identity) -> Option<&ValueBox> {
        self.entries.get(name)?.get(identity)
    }

    /// Insert an erased value under `(name, identity)`.
    pub fn insert(&mut self, name: &str, identity: Identity, value: ValueBox) {
        match self.entries.get_mut(name) {
            Some(group) => {
                group.insert(identity, value);
            }
            None => {
                let mut group = HashMap::new();
                group.insert(identity, value);
                self.entries.insert(Arc::from(name), group);
            }
        }
    }

    /// Whether `(name, identity)` has a value.
    pub fn contains(&self, name: &str, identity: &Identity) -> bool {
        self.lookup(name, identity).is_some()
    }

    /// Total number of cached values across all source names.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    /// Whether the cache holds no values.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(HashMap::is_empty)
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, group) in &self.entries {
            let mut identities: Vec<_> = group.keys().collect();
            identities.sort();
            map.entry(name, &identities);
        }
        map.finish()
    }
}
