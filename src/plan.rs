//! The plan tree: a declarative description of a fetch, built from five
//! node variants and consumed by the runner.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::FetchResult;
use crate::source::{DataSource, DynSource, SourceCell};
use crate::value::{boxed, unboxed, ValueBox};

pub(crate) type MapFn = Box<dyn FnOnce(ValueBox) -> FetchResult<ValueBox> + Send + Sync>;
pub(crate) type BindFn = Box<dyn FnOnce(ValueBox) -> FetchResult<Node> + Send + Sync>;

/// The untyped plan tree. A closed sum: nothing outside this crate can add
/// a variant, so the analyzer and planter dispatch exhaustively.
///
/// Transformation consumes the tree by value and produces a new one; a
/// fully-resolved tree is exactly `Value`.
pub(crate) enum Node {
    /// A constant; already resolved.
    Value(ValueBox),
    /// An unresolved data-source leaf.
    Source(DynSource),
    /// A pure transformation applied once the child resolves.
    Map(MapFn, Box<Node>),
    /// A data-dependent continuation; the subsequent tree is unknown until
    /// the child resolves. The only variant that introduces new fetches
    /// mid-run.
    Bind(BindFn, Box<Node>),
    /// An ordered sequence of children resolved concurrently.
    Product(Vec<Node>),
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Value(_) => f.write_str("Value(<opaque>)"),
            Node::Source(source) => f
                .debug_struct("Source")
                .field("name", &source.source_name())
                .field("identity", &source.identity())
                .finish(),
            Node::Map(_, child) => f.debug_tuple("Map").field(&"<closure>").field(child).finish(),
            Node::Bind(_, child) => f
                .debug_tuple("Bind")
                .field(&"<closure>")
                .field(child)
                .finish(),
            Node::Product(children) => f.debug_tuple("Product").field(children).finish(),
        }
    }
}

/// A declarative description of a fetch that resolves to a `T`.
///
/// Plans are built from [`value`](Plan::value) and [`source`](Plan::source)
/// leaves combined with [`map`](Plan::map), [`then`](Plan::then),
/// [`collect`], [`zip`], and [`traverse`], then handed to
/// [`run`](crate::run) or [`execute`](crate::execute). Nothing is fetched
/// until the plan is run; the runner discovers every independent source in
/// the tree and dispatches them batched and in parallel.
pub struct Plan<T> {
    pub(crate) node: Node,
    marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Plan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Plan").field(&self.node).finish()
    }
}

impl<T> Plan<T> {
    pub(crate) fn from_node(node: Node) -> Self {
        Self {
            node,
            marker: PhantomData,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Plan<T> {
    /// Lift a pure value. Adds no fetches.
    pub fn value(value: T) -> Self {
        Self::from_node(Node::Value(boxed(value)))
    }

    /// Lift a data source describing one item to fetch.
    pub fn source<S: DataSource<Value = T>>(source: S) -> Self {
        Self::from_node(Node::Source(Arc::new(SourceCell(source))))
    }

    /// Apply a pure transformation to the resolved value.
    pub fn map<U, F>(self, f: F) -> Plan<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + Sync + 'static,
    {
        Plan::from_node(Node::Map(
            Box::new(move |raw| Ok(boxed(f(unboxed::<T>(raw)?)))),
            Box::new(self.node),
        ))
    }

    /// Continue with a plan computed from the resolved value. Evaluation of
    /// `f` is deferred until this plan resolves, so the fetches it
    /// introduces are unknown (and undispatched) until then.
    pub fn then<U, F>(self, f: F) -> Plan<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Plan<U> + Send + Sync + 'static,
    {
        Plan::from_node(Node::Bind(
            Box::new(move |raw| Ok(f(unboxed::<T>(raw)?).node)),
            Box::new(self.node),
        ))
    }
}

/// The product of a sequence of plans: every child resolves concurrently,
/// and the output order equals the input order regardless of completion
/// order. An empty input resolves to an empty `Vec` without dispatching.
pub fn collect<T>(items: Vec<Plan<T>>) -> Plan<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
{
    let children = items.into_iter().map(|plan| plan.node).collect();

    Plan::from_node(Node::Map(
        Box::new(|raw| {
            let elements = unboxed::<Vec<ValueBox>>(raw)?;
            let mut out = Vec::with_capacity(elements.len());
            for element in elements {
                out.push(unboxed::<T>(element)?);
            }
            Ok(boxed(out))
        }),
        Box::new(Node::Product(children)),
    ))
}

/// The product of two plans of different types. Both sides resolve
/// concurrently.
pub fn zip<A, B>(left: Plan<A>, right: Plan<B>) -> Plan<(A, B)>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    Plan::from_node(Node::Map(
        Box::new(|raw| {
            let mut elements = unboxed::<Vec<ValueBox>>(raw)?;
            let b = unboxed::<B>(elements.pop().ok_or_else(pair_shape)?)?;
            let a = unboxed::<A>(elements.pop().ok_or_else(pair_shape)?)?;
            Ok(boxed((a, b)))
        }),
        Box::new(Node::Product(vec![left.node, right.node])),
    ))
}

fn pair_shape() -> crate::FetchError {
    crate::FetchError::value_shape("product of a pair resolved to fewer than two values")
}

/// Map each element of the resolved sequence to a plan and resolve them all
/// concurrently, preserving order. Equal to
/// `items.then(|xs| collect(xs.into_iter().map(f).collect()))`.
pub fn traverse<A, B, F>(items: Plan<Vec<A>>, f: F) -> Plan<Vec<B>>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    F: Fn(A) -> Plan<B> + Send + Sync + 'static,
{
    items.then(move |xs| collect(xs.into_iter().map(&f).collect()))
}
