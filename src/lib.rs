//! Declarative remote-data fetching with automatic batching, concurrency,
//! and deduplication.
//!
//! Application code builds a [`Plan`], a tree of fetch operations and pure
//! combinators, and hands it to [`run`]. The runner walks the tree,
//! discovers the current frontier of ready-to-fetch sources, groups them by
//! source name, dispatches batched or single fetches in parallel, plants
//! the results back into the tree, and repeats until the tree collapses to
//! a value. Along the way it guarantees:
//!
//! - **Batching**: distinct outstanding identities of one source type on
//!   the same frontier are coalesced into one `fetch_multi` call.
//! - **Concurrency**: independent fetches from different sources run in
//!   parallel.
//! - **Deduplication**: equal `(source_name, identity)` pairs are fetched
//!   at most once per run, and seeded cache entries not at all.
//!
//! ```
//! use fetchplan::{collect, run_blocking, DataSource, Env, FetchResult, Identity, Plan, RunOptions};
//!
//! #[derive(Clone)]
//! struct UserName(u64);
//!
//! impl DataSource for UserName {
//!     type Value = String;
//!
//!     fn source_name(&self) -> &str {
//!         "UserName"
//!     }
//!
//!     fn identity(&self) -> Identity {
//!         Identity::new(self.0)
//!     }
//!
//!     fn fetch(&self, _env: Env) -> fetchplan::BoxFut<'static, FetchResult<String>> {
//!         let id = self.0;
//!         Box::pin(async move { Ok(format!("user-{id}")) })
//!     }
//! }
//!
//! let plan = collect(vec![Plan::source(UserName(1)), Plan::source(UserName(2))]);
//! let names = run_blocking(plan, RunOptions::default()).unwrap();
//! assert_eq!(names, vec!["user-1".to_string(), "user-2".to_string()]);
//! ```

/// Boxed future type.
pub type BoxFut<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

mod cache;
mod env;
mod error;
mod executor;
mod frontier;
mod plan;
mod plant;
mod runner;
mod source;
mod value;


pub use cache::Cache;
pub use env::Env;
pub use error::{DynSourceError, FetchError, FetchResult};
pub use executor::{DynExecutor, Executor, ThreadExecutor};
pub use plan::{collect, traverse, zip, Plan};
pub use runner::{execute, run, run_blocking, RunOptions};
pub use source::{cache_id, resource_name, DataSource, Identity};
pub use value::ValueBox;
