//! Mapper-wide settings and per-pair configuration.
//!
//! `PairConfig` holds everything registered for one type tuple: member
//! directives, construction factory, depth and reference settings, and hooks.
//! Pairs live in a `PairRegistry`; every registration stamps a fresh
//! revision, which keys the introspector's destination cache.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxHashMap;

use mapr_ir::{MapError, MapResult, Name, ObjectRef, TypeId, TypeTuple, Value};
use mapr_types::{DirectiveMap, MemberDirectives, TypePool};

use crate::projection::Expr;
use crate::scope::{MapScope, PendingTask};

/// Global mapper settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapperConfig {
    /// Unmapped destination members are a configuration error.
    pub require_destination_member_source: bool,
    /// Default for pairs that do not set it.
    pub preserve_references: bool,
    /// Default for pairs that do not set it. `None` is unbounded.
    pub max_depth: Option<u32>,
    /// Same-type mappings build a copy instead of returning the source.
    pub new_instance_for_same_type: bool,
    /// Null source collections stay null instead of becoming empty.
    pub allow_null_collections: bool,
    pub include_private_members: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            require_destination_member_source: false,
            preserve_references: false,
            max_depth: None,
            new_instance_for_same_type: true,
            allow_null_collections: false,
            include_private_members: false,
        }
    }
}

pub type ResolverFn = Arc<dyn Fn(&ObjectRef, &mut dyn MapScope) -> MapResult<Value> + Send + Sync>;
pub type ConditionFn = Arc<dyn Fn(&ObjectRef) -> bool + Send + Sync>;
pub type PostTransformFn = Arc<dyn Fn(Value) -> MapResult<Value> + Send + Sync>;
pub type FactoryFn = Arc<dyn Fn(&ObjectRef, &mut dyn MapScope) -> MapResult<ObjectRef> + Send + Sync>;
/// Synchronous hook over `(source, destination)`.
pub type HookFn = Arc<dyn Fn(&ObjectRef, &ObjectRef) -> MapResult<()> + Send + Sync>;
/// Async hook over `(source, destination)`; its future runs after the
/// synchronous tree completes.
pub type AsyncHookFn = Arc<dyn Fn(&ObjectRef, &ObjectRef) -> PendingTask + Send + Sync>;

/// Explicit source for a destination member.
#[derive(Clone)]
pub enum MemberResolver {
    /// Opaque closure. Cannot be projected.
    Fn(ResolverFn),
    /// Pure expression over `Expr::Source`.
    Expr(Expr),
}

impl fmt::Debug for MemberResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberResolver::Fn(_) => f.write_str("MemberResolver::Fn(..)"),
            MemberResolver::Expr(e) => f.debug_tuple("MemberResolver::Expr").field(e).finish(),
        }
    }
}

/// Guard deciding whether a member is mapped for a given source.
#[derive(Clone)]
pub enum Condition {
    Fn(ConditionFn),
    /// Boolean expression over `Expr::Source`.
    Expr(Expr),
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Fn(_) => f.write_str("Condition::Fn(..)"),
            Condition::Expr(e) => f.debug_tuple("Condition::Expr").field(e).finish(),
        }
    }
}

/// Directives for one destination member.
#[derive(Clone, Default)]
pub struct MemberConfig {
    pub ignore: bool,
    /// Dot-separated source path.
    pub map_from: Option<Arc<str>>,
    pub resolver: Option<MemberResolver>,
    pub condition: Option<Condition>,
    pub type_override: Option<TypeId>,
    pub post_transform: Option<PostTransformFn>,
}

impl MemberConfig {
    pub fn directives(&self) -> MemberDirectives {
        MemberDirectives {
            ignored: self.ignore,
            map_from: self.map_from.clone(),
            type_override: self.type_override,
            conditional: self.condition.is_some(),
            resolved: self.resolver.is_some(),
        }
    }

    /// Overlay the directives `delta` sets.
    fn merge(&mut self, delta: MemberConfig) {
        self.ignore |= delta.ignore;
        if delta.map_from.is_some() {
            self.map_from = delta.map_from;
        }
        if delta.resolver.is_some() {
            self.resolver = delta.resolver;
        }
        if delta.condition.is_some() {
            self.condition = delta.condition;
        }
        if delta.type_override.is_some() {
            self.type_override = delta.type_override;
        }
        if delta.post_transform.is_some() {
            self.post_transform = delta.post_transform;
        }
    }

    fn conflict(&self) -> Option<&'static str> {
        let sourced = self.resolver.is_some() || self.map_from.is_some();
        if self.ignore
            && (sourced
                || self.condition.is_some()
                || self.type_override.is_some()
                || self.post_transform.is_some())
        {
            return Some("ignored member cannot also carry a source, condition or conversion");
        }
        if self.resolver.is_some() && self.map_from.is_some() {
            return Some("member has both a resolver and a source path");
        }
        None
    }
}

impl fmt::Debug for MemberConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberConfig")
            .field("ignore", &self.ignore)
            .field("map_from", &self.map_from)
            .field("resolver", &self.resolver)
            .field("condition", &self.condition)
            .field("type_override", &self.type_override)
            .field("post_transform", &self.post_transform.is_some())
            .finish()
    }
}

/// Everything configured for one type tuple.
#[derive(Clone)]
pub struct PairConfig {
    pub tuple: TypeTuple,
    pub members: FxHashMap<Name, MemberConfig>,
    pub factory: Option<FactoryFn>,
    pub max_depth: Option<u32>,
    pub preserve_references: Option<bool>,
    pub before_map: Vec<HookFn>,
    pub after_map: Vec<HookFn>,
    pub after_map_async: Vec<AsyncHookFn>,
    /// Stamped by the registry when stored.
    pub revision: u64,
}

impl PairConfig {
    pub fn new(tuple: TypeTuple) -> Self {
        Self {
            tuple,
            members: FxHashMap::default(),
            factory: None,
            max_depth: None,
            preserve_references: None,
            before_map: Vec::new(),
            after_map: Vec::new(),
            after_map_async: Vec::new(),
            revision: 0,
        }
    }

    pub fn member(&self, name: Name) -> Option<&MemberConfig> {
        self.members.get(&name)
    }

    pub fn member_mut(&mut self, name: Name) -> &mut MemberConfig {
        self.members.entry(name).or_default()
    }

    /// Overlay `delta`: settings it makes replace the current ones, and its
    /// hooks run after the existing hooks.
    pub fn merge(&mut self, delta: PairConfig) {
        for (name, member) in delta.members {
            self.member_mut(name).merge(member);
        }
        if delta.factory.is_some() {
            self.factory = delta.factory;
        }
        if delta.max_depth.is_some() {
            self.max_depth = delta.max_depth;
        }
        if delta.preserve_references.is_some() {
            self.preserve_references = delta.preserve_references;
        }
        self.before_map.extend(delta.before_map);
        self.after_map.extend(delta.after_map);
        self.after_map_async.extend(delta.after_map_async);
    }

    pub fn directives(&self) -> DirectiveMap {
        self.members
            .iter()
            .map(|(&name, member)| (name, member.directives()))
            .collect()
    }

    /// Reject conflicting directives and directives for members the
    /// destination does not have.
    pub fn validate(&self, pool: &TypePool) -> MapResult<()> {
        let pair = pool.pair(self.tuple);
        let def = pool.record_def(self.tuple.dest);
        for (&name, member) in &self.members {
            if let Some(message) = member.conflict() {
                return Err(MapError::member_configuration(
                    pair,
                    pool.lookup_name(name),
                    message,
                ));
            }
            if let Some(def) = &def {
                let known = def.field(name).is_some()
                    || def
                        .ctor
                        .as_ref()
                        .is_some_and(|ctor| ctor.params.iter().any(|p| p.name == name));
                if !known {
                    return Err(MapError::member_configuration(
                        pair,
                        pool.lookup_name(name),
                        "destination has no member with this name",
                    ));
                }
            }
        }
        if self.max_depth == Some(0) {
            return Err(MapError::configuration(pair, "max depth must be at least 1"));
        }
        Ok(())
    }

    pub fn has_hooks(&self) -> bool {
        !self.before_map.is_empty() || !self.after_map.is_empty() || !self.after_map_async.is_empty()
    }
}

impl fmt::Debug for PairConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairConfig")
            .field("tuple", &self.tuple)
            .field("members", &self.members)
            .field("factory", &self.factory.is_some())
            .field("max_depth", &self.max_depth)
            .field("preserve_references", &self.preserve_references)
            .field("before_map", &self.before_map.len())
            .field("after_map", &self.after_map.len())
            .field("after_map_async", &self.after_map_async.len())
            .field("revision", &self.revision)
            .finish()
    }
}

/// Registered pair configurations.
pub struct PairRegistry {
    pairs: DashMap<TypeTuple, Arc<PairConfig>>,
    revision: AtomicU64,
}

impl PairRegistry {
    pub fn new() -> Self {
        Self {
            pairs: DashMap::new(),
            revision: AtomicU64::new(0),
        }
    }

    pub fn get(&self, tuple: TypeTuple) -> Option<Arc<PairConfig>> {
        self.pairs.get(&tuple).map(|entry| Arc::clone(&entry))
    }

    /// Store `config`, replacing any previous configuration for its tuple.
    /// Returns the revision stamped on it.
    pub fn insert(&self, mut config: PairConfig) -> u64 {
        let revision = self.next_revision();
        config.revision = revision;
        self.pairs.insert(config.tuple, Arc::new(config));
        revision
    }

    /// Merge `delta` into the stored configuration for its tuple while
    /// holding the entry, so concurrent registrations on one pair all land.
    /// `check` sees the merged configuration; if it fails nothing is stored.
    pub fn merge(
        &self,
        delta: PairConfig,
        check: impl FnOnce(&PairConfig) -> MapResult<()>,
    ) -> MapResult<u64> {
        let tuple = delta.tuple;
        let entry = self.pairs.entry(tuple);
        let mut merged = match &entry {
            Entry::Occupied(slot) => PairConfig::clone(slot.get()),
            Entry::Vacant(_) => PairConfig::new(tuple),
        };
        merged.merge(delta);
        check(&merged)?;
        let revision = self.next_revision();
        merged.revision = revision;
        entry.insert(Arc::new(merged));
        Ok(revision)
    }

    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Latest revision handed out; zero before any registration.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Default for PairRegistry {
    fn default() -> Self {
        Self::new()
    }
}
