//! Per-call mapping state.
//!
//! One `MappingContext` lives for one outermost mapping call and is threaded
//! explicitly through every nested mapping, so concurrent calls never share
//! state. It holds:
//!
//! - the reference map, `(source identity, destination type)` to the
//!   destination already built for it
//! - depth counters: active frames per type tuple along the current chain
//! - the parameter bag handed to resolvers and factories
//! - the pending-task list, present only under `Mapper::map_async`
//! - truncations recorded when a depth limit cut the graph

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use mapr_ir::{ObjectRef, RecursionLimitReached, TypeId, TypeTuple};
use mapr_plan::{Parameter, PendingTask};

/// Source kept alongside its destination so the identity key stays valid
/// for the context's lifetime.
struct Preserved {
    _source: ObjectRef,
    dest: ObjectRef,
}

/// State shared by every mapping step of one call.
#[derive(Default)]
pub struct MappingContext {
    references: FxHashMap<(usize, TypeId), Preserved>,
    depth: FxHashMap<TypeTuple, u32>,
    parameters: FxHashMap<String, Parameter>,
    pending: Option<Vec<PendingTask>>,
    truncations: Vec<RecursionLimitReached>,
}

impl MappingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter for resolvers and factories to read.
    #[must_use]
    pub fn with_parameter<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.set_parameter(name, value);
        self
    }

    pub fn set_parameter<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.parameters.insert(name.into(), Arc::new(value));
    }

    pub fn parameter(&self, name: &str) -> Option<Parameter> {
        self.parameters.get(name).cloned()
    }

    /// Typed parameter lookup; `None` when absent or of another type.
    pub fn parameter_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.parameter(name)?.downcast::<T>().ok()
    }

    /// Depth-limit truncations recorded so far.
    pub fn truncations(&self) -> &[RecursionLimitReached] {
        &self.truncations
    }

    /// Number of preserved source references.
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Whether async hooks can enqueue work.
    pub fn is_async(&self) -> bool {
        self.pending.is_some()
    }

    // Reference map

    pub(crate) fn reference(&self, source: &ObjectRef, dest: TypeId) -> Option<ObjectRef> {
        self.references
            .get(&(source.identity(), dest))
            .map(|p| p.dest.clone())
    }

    pub(crate) fn remember(&mut self, source: &ObjectRef, dest: TypeId, built: &ObjectRef) {
        self.references.insert(
            (source.identity(), dest),
            Preserved {
                _source: source.clone(),
                dest: built.clone(),
            },
        );
    }

    // Depth counters

    pub(crate) fn depth(&self, tuple: TypeTuple) -> u32 {
        self.depth.get(&tuple).copied().unwrap_or(0)
    }

    pub(crate) fn enter(&mut self, tuple: TypeTuple) {
        *self.depth.entry(tuple).or_insert(0) += 1;
    }

    pub(crate) fn leave(&mut self, tuple: TypeTuple) {
        if let Some(count) = self.depth.get_mut(&tuple) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.depth.remove(&tuple);
            }
        }
    }

    pub(crate) fn record_truncation(&mut self, event: RecursionLimitReached) {
        self.truncations.push(event);
    }

    // Async work

    pub(crate) fn begin_async(&mut self) {
        self.pending = Some(Vec::new());
    }

    pub(crate) fn take_pending(&mut self) -> Vec<PendingTask> {
        self.pending.take().unwrap_or_default()
    }

    /// Queue `task`, or hand it back when no pending list is active.
    pub(crate) fn enqueue(&mut self, task: PendingTask) -> Result<(), PendingTask> {
        match &mut self.pending {
            Some(pending) => {
                pending.push(task);
                Ok(())
            }
            None => Err(task),
        }
    }
}

impl fmt::Debug for MappingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingContext")
            .field("references", &self.references.len())
            .field("depth", &self.depth)
            .field("parameters", &self.parameters.keys().collect::<Vec<_>>())
            .field("pending", &self.pending.as_ref().map(Vec::len))
            .field("truncations", &self.truncations)
            .finish()
    }
}
