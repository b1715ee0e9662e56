//! The interface compiled plans use to call back into the running mapping.
//!
//! Resolvers, factories, custom converters and async hooks only see a
//! `MapScope`; the executor in `mapr` implements it. This keeps the planner
//! free of any dependency on the cache or the mapping context.

use std::any::Any;
use std::sync::Arc;

use futures::future::BoxFuture;

use mapr_ir::{MapResult, TypeId, Value};

/// An async hook's deferred work.
pub type PendingTask = BoxFuture<'static, MapResult<()>>;

/// A value from the context's parameter bag.
pub type Parameter = Arc<dyn Any + Send + Sync>;

/// Callbacks available while a transform runs.
pub trait MapScope {
    /// Map `value` to `dest` through the compiled transform for its runtime
    /// type, inside the active context.
    fn map_value(&mut self, value: &Value, dest: TypeId) -> MapResult<Value>;

    /// Look up a parameter injected by the caller.
    fn parameter(&self, name: &str) -> Option<Parameter>;

    /// Defer `task` until the synchronous transform tree completes.
    ///
    /// Fails with an async usage error when the mapping was not started
    /// through the async entry point.
    fn enqueue(&mut self, task: PendingTask) -> MapResult<()>;
}
