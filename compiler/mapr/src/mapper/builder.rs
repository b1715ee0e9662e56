//! Fluent builders for a `Mapper` and for per-pair configuration.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;

use mapr_ir::{MapResult, ObjectRef, SharedInterner, TypeId, TypeTuple, Value};
use mapr_plan::{
    Condition, Expr, MapScope, MapperConfig, MappingRule, MemberConfig, MemberResolver,
    PairConfig, RuleSet,
};

use super::Mapper;

/// Settings and extra rules for a new `Mapper`.
#[must_use]
pub struct MapperBuilder {
    config: MapperConfig,
    rules: RuleSet,
    interner: Option<SharedInterner>,
}

impl MapperBuilder {
    pub fn new() -> Self {
        Self {
            config: MapperConfig::default(),
            rules: RuleSet::builtin(),
            interner: None,
        }
    }

    pub fn require_destination_member_source(mut self, on: bool) -> Self {
        self.config.require_destination_member_source = on;
        self
    }

    pub fn preserve_references(mut self, on: bool) -> Self {
        self.config.preserve_references = on;
        self
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.config.max_depth = Some(depth);
        self
    }

    pub fn new_instance_for_same_type(mut self, on: bool) -> Self {
        self.config.new_instance_for_same_type = on;
        self
    }

    pub fn allow_null_collections(mut self, on: bool) -> Self {
        self.config.allow_null_collections = on;
        self
    }

    pub fn include_private_members(mut self, on: bool) -> Self {
        self.config.include_private_members = on;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn rule(mut self, rule: Arc<dyn MappingRule>) -> Self {
        self.rules.add(rule);
        self
    }

    /// Share names with other pools built from the same interner.
    pub fn interner(mut self, interner: SharedInterner) -> Self {
        self.interner = Some(interner);
        self
    }

    pub fn build(self) -> Mapper {
        // A depth of zero would truncate every root; treat it as unbounded.
        let mut config = self.config;
        if config.max_depth == Some(0) {
            tracing::warn!("max depth 0 ignored");
            config.max_depth = None;
        }
        Mapper::from_parts(config, self.rules, self.interner.unwrap_or_default())
    }
}

impl Default for MapperBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for one `source -> dest` pair, applied by `register`.
///
/// Collects only the settings made through it; `register` merges them into
/// the pair's stored configuration, so repeated `configure` calls add to
/// earlier ones.
#[must_use]
pub struct RuleBuilder<'m> {
    mapper: &'m Mapper,
    config: PairConfig,
}

impl<'m> RuleBuilder<'m> {
    pub(super) fn new(mapper: &'m Mapper, tuple: TypeTuple) -> Self {
        Self {
            mapper,
            config: PairConfig::new(tuple),
        }
    }

    fn member(&mut self, name: &str) -> &mut MemberConfig {
        let name = self.mapper.pool.name(name);
        self.config.member_mut(name)
    }

    /// Leave `member` untouched.
    pub fn ignore(mut self, member: &str) -> Self {
        self.member(member).ignore = true;
        self
    }

    /// Read `member` from a dot-separated source path.
    pub fn map_from(mut self, member: &str, path: &str) -> Self {
        self.member(member).map_from = Some(Arc::from(path));
        self
    }

    /// Compute `member` with a closure. Pairs using this cannot be projected.
    pub fn resolve_with<F>(mut self, member: &str, resolve: F) -> Self
    where
        F: Fn(&ObjectRef, &mut dyn MapScope) -> MapResult<Value> + Send + Sync + 'static,
    {
        self.member(member).resolver = Some(MemberResolver::Fn(Arc::new(resolve)));
        self
    }

    /// Compute `member` from an expression over the source.
    pub fn resolve_expr(mut self, member: &str, expr: Expr) -> Self {
        self.member(member).resolver = Some(MemberResolver::Expr(expr));
        self
    }

    /// Map `member` only when `test` accepts the source.
    pub fn condition<F>(mut self, member: &str, test: F) -> Self
    where
        F: Fn(&ObjectRef) -> bool + Send + Sync + 'static,
    {
        self.member(member).condition = Some(Condition::Fn(Arc::new(test)));
        self
    }

    pub fn condition_expr(mut self, member: &str, test: Expr) -> Self {
        self.member(member).condition = Some(Condition::Expr(test));
        self
    }

    /// Convert the source value as if `member` were of type `ty`.
    pub fn type_override(mut self, member: &str, ty: TypeId) -> Self {
        self.member(member).type_override = Some(ty);
        self
    }

    /// Apply `post` to the converted value before it is stored.
    pub fn post_transform<F>(mut self, member: &str, post: F) -> Self
    where
        F: Fn(Value) -> MapResult<Value> + Send + Sync + 'static,
    {
        self.member(member).post_transform = Some(Arc::new(post));
        self
    }

    /// Build destinations with `factory` instead of the default constructor.
    pub fn construct_with<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ObjectRef, &mut dyn MapScope) -> MapResult<ObjectRef> + Send + Sync + 'static,
    {
        self.config.factory = Some(Arc::new(factory));
        self
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.config.max_depth = Some(depth);
        self
    }

    pub fn preserve_references(mut self, on: bool) -> Self {
        self.config.preserve_references = Some(on);
        self
    }

    /// Runs after construction, before any member is bound.
    pub fn before_map<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ObjectRef, &ObjectRef) -> MapResult<()> + Send + Sync + 'static,
    {
        self.config.before_map.push(Arc::new(hook));
        self
    }

    /// Runs after every member is bound.
    pub fn after_map<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ObjectRef, &ObjectRef) -> MapResult<()> + Send + Sync + 'static,
    {
        self.config.after_map.push(Arc::new(hook));
        self
    }

    /// Queue work to be awaited by `Mapper::map_async`. Mapping the pair
    /// synchronously fails with an async usage error.
    pub fn after_map_async<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ObjectRef, ObjectRef) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MapResult<()>> + Send + 'static,
    {
        self.config
            .after_map_async
            .push(Arc::new(move |src: &ObjectRef, dest: &ObjectRef| {
                hook(src.clone(), dest.clone()).boxed()
            }));
        self
    }

    /// Validate and store the configuration, invalidating every cached
    /// transform that depends on the pair.
    pub fn register(self) -> MapResult<()> {
        let Self { mapper, config } = self;
        let tuple = config.tuple;
        let revision = mapper
            .pairs
            .merge(config, |merged| merged.validate(&mapper.pool))?;
        tracing::debug!(pair = %mapper.pool.pair(tuple), revision, "pair configured");
        mapper.invalidate(tuple);
        Ok(())
    }
}
