//! The `Mapper` facade: configuration, transform cache and entry points.
//!
//! # Usage
//!
//! ```text
//! let mapper = Mapper::builder().preserve_references(true).build();
//! let order = mapper.pool().record("Order").field("Id", TypeId::I32).build()?;
//! ...
//! mapper.configure(order, order_dto).ignore("Notes").register()?;
//! let dto = mapper.map(&source, order_dto)?;
//! ```
//!
//! Planning errors surface when a transform is first requested, before any
//! instance is touched. Nested record pairs reached by a plan are built at
//! the same time.

mod builder;

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashSet;

use mapr_ir::{
    MapError, MapKind, MapResult, ObjectRef, SharedInterner, TransformKey, TypeId, TypeTuple,
    Value,
};
use mapr_plan::{
    compile_projection, Converter, Expr, MapScope, MapperConfig, MappingRule, PairRegistry,
    Planner, RuleSet,
};
use mapr_types::{Introspector, TypePool};

use crate::cache::{CompiledTransform, TransformBody, TransformCache};
use crate::context::MappingContext;
use crate::exec::Executor;

pub use builder::{MapperBuilder, RuleBuilder};

/// A configured mapping compiler. Share it across threads behind a
/// reference or `Arc`.
pub struct Mapper {
    pool: TypePool,
    config: MapperConfig,
    pairs: PairRegistry,
    rules: RwLock<RuleSet>,
    introspector: Introspector,
    cache: TransformCache,
}

impl Mapper {
    pub fn builder() -> MapperBuilder {
        MapperBuilder::new()
    }

    /// Mapper with default settings and the built-in rules.
    pub fn new() -> Self {
        MapperBuilder::new().build()
    }

    fn from_parts(config: MapperConfig, rules: RuleSet, interner: SharedInterner) -> Self {
        Self {
            pool: TypePool::new(interner),
            introspector: Introspector::new(config.include_private_members),
            config,
            pairs: PairRegistry::new(),
            rules: RwLock::new(rules),
            cache: TransformCache::new(),
        }
    }

    /// Types are registered here before they are mapped.
    pub fn pool(&self) -> &TypePool {
        &self.pool
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Start configuring the `source -> dest` pair. Nothing changes until
    /// `RuleBuilder::register`.
    pub fn configure(&self, source: TypeId, dest: TypeId) -> RuleBuilder<'_> {
        RuleBuilder::new(self, TypeTuple::new(source, dest))
    }

    /// Add a rule to the chain. Every cached transform is dropped.
    pub fn add_rule(&self, rule: Arc<dyn MappingRule>) {
        tracing::debug!(rule = rule.name(), priority = rule.priority(), "rule added");
        self.rules.write().add(rule);
        self.cache.clear();
    }

    /// Names of the rules in resolution order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.read().names()
    }

    /// Number of cached transforms.
    pub fn cached_transforms(&self) -> usize {
        self.cache.len()
    }

    fn invalidate(&self, tuple: TypeTuple) {
        self.introspector.forget(tuple.dest);
        let removed = self.cache.invalidate(tuple);
        tracing::debug!(pair = %self.pool.pair(tuple), removed, "configuration changed");
    }

    /// Cached transform for `source -> dest`, built on first use.
    pub fn transform(
        &self,
        source: TypeId,
        dest: TypeId,
        kind: MapKind,
    ) -> MapResult<Arc<CompiledTransform>> {
        let key = TransformKey::new(TypeTuple::new(source, dest), kind);
        if let Some(hit) = self.cache.get(key) {
            return Ok(hit);
        }
        // Read before any configuration, so a change made mid-build marks
        // the result stale.
        let generation = self.cache.generation();
        let rules = self.rules.read().clone();
        let planner = Planner::new(&self.pool, &self.config, &self.pairs, &rules, &self.introspector);
        let mut building = FxHashSet::default();
        self.build(&planner, key, generation, &mut building)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(pair = %self.pool.pair(key.tuple), kind = %key.kind))]
    fn build(
        &self,
        planner: &Planner<'_>,
        key: TransformKey,
        generation: u64,
        building: &mut FxHashSet<TransformKey>,
    ) -> MapResult<Arc<CompiledTransform>> {
        building.insert(key);
        let tuple = key.tuple;

        let (body, dependencies) = match key.kind {
            MapKind::Projection => {
                (TransformBody::Projection(compile_projection(planner, tuple)?), Vec::new())
            }
            // Populating an instance always goes through a plan, even for a
            // same-type pair the identity rule would pass through.
            MapKind::MapToExisting => {
                if !self.pool.is_record(tuple.source) || !self.pool.is_record(tuple.dest) {
                    return Err(MapError::configuration(
                        self.pool.pair(tuple),
                        "mapping into an existing instance needs record types",
                    ));
                }
                let plan = planner.plan(tuple, MapKind::MapToExisting)?;
                let deps = plan.dependencies();
                (TransformBody::Plan(plan), deps)
            }
            MapKind::ConstructNew => match planner.converter(tuple, MapKind::ConstructNew)? {
                Converter::Nested(nested) if nested == tuple => {
                    let plan = planner.plan(tuple, MapKind::ConstructNew)?;
                    let deps = plan.dependencies();
                    (TransformBody::Plan(plan), deps)
                }
                converter => {
                    let mut deps = Vec::new();
                    converter.dependencies(&mut deps);
                    (TransformBody::Value(converter), deps)
                }
            },
        };

        // Nested pairs are built now so their errors surface before any
        // instance is touched. Cycles stop at pairs already being built.
        for &dep in &dependencies {
            let dep_key = TransformKey::new(dep, MapKind::ConstructNew);
            if building.contains(&dep_key) || self.cache.get(dep_key).is_some() {
                continue;
            }
            self.build(planner, dep_key, generation, building)?;
        }

        tracing::debug!(dependencies = dependencies.len(), "transform compiled");
        Ok(self.cache.insert(
            CompiledTransform {
                key,
                body,
                dependencies,
            },
            generation,
        ))
    }

    /// Run a compiled transform. `existing` is required for map-to-existing
    /// transforms; `cx` defaults to a fresh context.
    pub fn execute(
        &self,
        transform: &CompiledTransform,
        source: &Value,
        existing: Option<ObjectRef>,
        cx: Option<&mut MappingContext>,
    ) -> MapResult<Value> {
        match cx {
            Some(cx) => Executor::new(self, cx).run(transform, source, existing),
            None => {
                let mut cx = MappingContext::new();
                Executor::new(self, &mut cx).run(transform, source, existing)
            }
        }
    }

    /// Map `source` to a new `dest` instance.
    ///
    /// The transform is chosen by the source's runtime type. A null source
    /// maps to null, or to the destination's default for scalars.
    pub fn map(&self, source: &Value, dest: TypeId) -> MapResult<Value> {
        let mut cx = MappingContext::new();
        self.map_with(source, dest, &mut cx)
    }

    /// Map `source` to `dest` inside an explicit context, e.g. one carrying
    /// parameters or shared with earlier calls for reference preservation.
    pub fn map_with(&self, source: &Value, dest: TypeId, cx: &mut MappingContext) -> MapResult<Value> {
        Executor::new(self, cx).map_value(source, dest)
    }

    /// Populate `dest` from `source`, leaving unbound members untouched.
    /// A null source leaves `dest` as it is.
    pub fn map_into(&self, source: &Value, dest: &ObjectRef) -> MapResult<ObjectRef> {
        let Some(from) = source.runtime_type() else {
            return Ok(dest.clone());
        };
        let transform = self.transform(from, dest.ty(), MapKind::MapToExisting)?;
        let mut cx = MappingContext::new();
        match Executor::new(self, &mut cx).run(&transform, source, Some(dest.clone()))? {
            Value::Object(obj) => Ok(obj),
            _ => Ok(dest.clone()),
        }
    }

    /// Map `source` to `dest`, then await every task queued by async hooks.
    ///
    /// The transform tree itself runs synchronously; async hooks only queue
    /// work. The first failing task fails the whole call.
    pub async fn map_async(&self, source: &Value, dest: TypeId) -> MapResult<Value> {
        let (value, pending) = {
            let mut cx = MappingContext::new();
            cx.begin_async();
            let value = self.map_with(source, dest, &mut cx)?;
            (value, cx.take_pending())
        };
        tracing::debug!(tasks = pending.len(), "awaiting async hooks");
        futures::future::try_join_all(pending).await?;
        Ok(value)
    }

    /// Pure expression equivalent of the `source -> dest` mapping.
    pub fn projection(&self, source: TypeId, dest: TypeId) -> MapResult<Expr> {
        let transform = self.transform(source, dest, MapKind::Projection)?;
        transform.projection().cloned().ok_or_else(|| {
            MapError::configuration(self.pool.pair(transform.tuple()), "not a projection")
        })
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new()
    }
}
