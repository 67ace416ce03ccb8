//! Frontier extraction: the set of source leaves that are ready to fetch
//! *now*, grouped by source name.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::plan::Node;
use crate::source::{DynSource, Identity};

/// One batch-dispatch group: every distinct unresolved identity of one
/// source name on the current frontier, in first-seen order.
pub(crate) struct Group {
    pub(crate) name: Arc<str>,
    pub(crate) sources: Vec<DynSource>,
}

/// Walk the tree and collect its ready frontier.
///
/// `Value` contributes nothing; `Source` contributes itself; `Map` and
/// `Bind` recurse into the child only, since a bind's continuation is not
/// yet known. That makes `Bind` the barrier that splits a run into
/// sequential phases. `Product` recurses into every child, which is what
/// makes siblings concurrent.
///
/// Groups come back in source-name order, deduplicated by identity: an
/// identity appearing in several subtrees yields one entry.
pub(crate) fn analyze(node: &Node) -> Vec<Group> {
    let mut groups: BTreeMap<Arc<str>, (Vec<DynSource>, HashSet<Identity>)> = BTreeMap::new();
    walk(node, &mut groups);

    groups
        .into_iter()
        .map(|(name, (sources, _seen))| Group { name, sources })
        .collect()
}

fn walk(node: &Node, groups: &mut BTreeMap<Arc<str>, (Vec<DynSource>, HashSet<Identity>)>) {
    match node {
        Node::Value(_) => {}
        Node::Source(source) => {
            let (sources, seen) = groups
                .entry(Arc::from(source.source_name()))
                .or_default();
            if seen.insert(source.identity()) {
                sources.push(Arc::clone(source));
            }
        }
        Node::Map(_, child) | Node::Bind(_, child) => walk(child, groups),
        Node::Product(children) => {
            for child in children {
                walk(child, groups);
            }
        }
    }
}
