//! Compiled-transform cache.
//!
//! Keyed by `(TypeTuple, MapKind)`. Lookups never wait on a build: a miss is
//! built outside any lock and inserted afterwards, so two threads racing on
//! the same key both build and the later insert wins. Both results are
//! equivalent; the loser is wasted work.
//!
//! Every invalidation bumps a generation counter. A build that started
//! before an invalidation is returned to its caller but not inserted, so a
//! stale plan never lands in the cache after its configuration changed.
//! Inserts and invalidations exclude each other; lookups take no lock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;

use mapr_ir::{MapKind, TransformKey, TypeTuple};
use mapr_plan::{Converter, Expr, MappingPlan};

/// The executable form of one transform.
#[derive(Debug)]
pub enum TransformBody {
    /// Record pair: run the plan.
    Plan(MappingPlan),
    /// Any other pair (collections, scalars, nullable wrappers).
    Value(Converter),
    Projection(Expr),
}

/// A transform built for one `(TypeTuple, MapKind)`. Immutable.
#[derive(Debug)]
pub struct CompiledTransform {
    pub key: TransformKey,
    pub body: TransformBody,
    /// Record tuples this transform maps through.
    pub dependencies: Vec<TypeTuple>,
}

impl CompiledTransform {
    pub fn tuple(&self) -> TypeTuple {
        self.key.tuple
    }

    pub fn kind(&self) -> MapKind {
        self.key.kind
    }

    pub fn plan(&self) -> Option<&MappingPlan> {
        match &self.body {
            TransformBody::Plan(plan) => Some(plan),
            _ => None,
        }
    }

    pub fn projection(&self) -> Option<&Expr> {
        match &self.body {
            TransformBody::Projection(expr) => Some(expr),
            _ => None,
        }
    }
}

/// Concurrent cache of compiled transforms.
pub struct TransformCache {
    entries: DashMap<TransformKey, Arc<CompiledTransform>>,
    generation: AtomicU64,
    /// Held shared by inserts, exclusively by invalidations.
    writes: RwLock<()>,
}

impl TransformCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            generation: AtomicU64::new(0),
            writes: RwLock::new(()),
        }
    }

    pub fn get(&self, key: TransformKey) -> Option<Arc<CompiledTransform>> {
        self.entries.get(&key).map(|entry| Arc::clone(&entry))
    }

    /// Current generation; read before starting a build.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Insert a transform built at `generation`. Returns the shared handle
    /// either way; the entry is only stored when no invalidation happened
    /// since the build started.
    pub fn insert(&self, transform: CompiledTransform, generation: u64) -> Arc<CompiledTransform> {
        let key = transform.key;
        let transform = Arc::new(transform);
        let _writes = self.writes.read();
        if self.generation() == generation {
            self.entries.insert(key, Arc::clone(&transform));
        } else {
            tracing::debug!(?key, "configuration changed during build; not cached");
        }
        transform
    }

    /// Remove every transform for `tuple` and every transform that depends
    /// on it, directly or through other cached transforms.
    ///
    /// Projections inline their nested plans without recording them, so all
    /// cached projections are dropped as well.
    pub fn invalidate(&self, tuple: TypeTuple) -> usize {
        let _writes = self.writes.write();
        self.generation.fetch_add(1, Ordering::AcqRel);

        let mut affected = FxHashSet::default();
        let mut queue = VecDeque::from([tuple]);
        while let Some(current) = queue.pop_front() {
            if !affected.insert(current) {
                continue;
            }
            for entry in &self.entries {
                let dependent = entry.key().tuple;
                if !affected.contains(&dependent) && entry.dependencies.contains(&current) {
                    queue.push_back(dependent);
                }
            }
        }

        let before = self.entries.len();
        self.entries
            .retain(|key, _| !affected.contains(&key.tuple) && key.kind != MapKind::Projection);
        let removed = before.saturating_sub(self.entries.len());
        tracing::debug!(tuples = affected.len(), removed, "invalidated transforms");
        removed
    }

    /// Drop everything, e.g. after the rule chain changed.
    pub fn clear(&self) {
        let _writes = self.writes.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TransformCache {
    fn default() -> Self {
        Self::new()
    }
}
