//! Planting: substitute cached values into source leaves and collapse the
//! pure combinators above them.

use crate::cache::Cache;
use crate::error::FetchResult;
use crate::plan::Node;
use crate::value::{boxed, ValueBox};

/// The outcome of one planting pass: the new tree plus counters the runner
/// uses for its progress check.
pub(crate) struct Planted {
    pub(crate) node: Node,
    /// Source leaves replaced by cached values.
    pub(crate) planted: usize,
    /// Binds whose child resolved, expanded into their continuations.
    pub(crate) bound: usize,
    /// Pure combinator nodes (maps, products) collapsed into values.
    pub(crate) collapsed: usize,
}

impl Planted {
    /// Whether the pass changed the tree at all. A completed iteration that
    /// made no progress on a non-value tree is a fatal runner error.
    pub(crate) fn progressed(&self) -> bool {
        self.planted + self.bound + self.collapsed > 0
    }
}

#[derive(Default)]
struct Stats {
    planted: usize,
    bound: usize,
    collapsed: usize,
}

/// One bottom-up pass over the tree against the current cache. Pure, and
/// O(tree size): each node is visited once and a bind's freshly-produced
/// subtree is not re-planted within the same pass (its sources join the
/// next iteration's frontier).
pub(crate) fn plant(node: Node, cache: &Cache) -> FetchResult<Planted> {
    let mut stats = Stats::default();
    let node = walk(node, cache, &mut stats)?;
    Ok(Planted {
        node,
        planted: stats.planted,
        bound: stats.bound,
        collapsed: stats.collapsed,
    })
}

fn walk(node: Node, cache: &Cache, stats: &mut Stats) -> FetchResult<Node> {
    Ok(match node {
        Node::Value(value) => Node::Value(value),

        Node::Source(source) => {
            match cache.lookup(source.source_name(), &source.identity()) {
                Some(value) => {
                    stats.planted += 1;
                    Node::Value(value.clone())
                }
                None => Node::Source(source),
            }
        }

        Node::Map(f, child) => match walk(*child, cache, stats)? {
            Node::Value(value) => {
                stats.collapsed += 1;
                Node::Value(f(value)?)
            }
            child => Node::Map(f, Box::new(child)),
        },

        Node::Bind(f, child) => match walk(*child, cache, stats)? {
            Node::Value(value) => {
                stats.bound += 1;
                f(value)?
            }
            child => Node::Bind(f, Box::new(child)),
        },

        Node::Product(children) => {
            let children = children
                .into_iter()
                .map(|child| walk(child, cache, stats))
                .collect::<FetchResult<Vec<_>>>()?;

            if children.iter().all(|child| matches!(child, Node::Value(_))) {
                stats.collapsed += 1;
                let values: Vec<ValueBox> = children
                    .into_iter()
                    .map(|child| match child {
                        Node::Value(value) => value,
                        _ => unreachable!("all children checked to be values"),
                    })
                    .collect();
                Node::Value(boxed(values))
            } else {
                Node::Product(children)
            }
        }
    })
}
