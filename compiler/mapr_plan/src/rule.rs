//! Mapping rules: the extension point for value conversions.
//!
//! # Resolution Order
//!
//! Rules are tried in priority order (lower number first); rules with equal
//! priority keep registration order. The first rule whose `can_handle`
//! accepts a pair emits the converter. Built-in rules use priorities 100 and
//! up, so user rules registered below 100 take precedence over them.
//!
//! | Rule       | Priority | Handles                                   |
//! |------------|----------|-------------------------------------------|
//! | identity   | 100      | same type (unless a copy is required), `ANY` |
//! | nullable   | 110      | either side `T?`                          |
//! | enum       | 120      | enum ↔ enum/integer/string                |
//! | primitive  | 130      | scalar ↔ scalar                           |
//! | sequence   | 140      | array/list/set ↔ array/list/set           |
//! | dictionary | 150      | map ↔ map                                 |
//! | record     | 160      | record ↔ record                           |

mod builtin;

use std::sync::Arc;

use mapr_ir::{ensure_sufficient_stack, MapError, MapKind, MapResult, TypeId, TypeTuple};
use mapr_types::TypePool;

use crate::config::MapperConfig;
use crate::converter::Converter;

pub use builtin::{
    DictionaryRule, EnumRule, IdentityRule, NullableRule, PrimitiveRule, RecordRule, SequenceRule,
};

/// A conversion strategy for a family of type pairs.
pub trait MappingRule: Send + Sync {
    /// Human-readable name, used in traces and custom converters.
    fn name(&self) -> &'static str;

    /// Lower runs first.
    fn priority(&self) -> u8;

    fn can_handle(&self, cx: &RuleContext<'_>, tuple: TypeTuple, kind: MapKind) -> bool;

    /// Build the converter. Only called after `can_handle` accepted the pair;
    /// a failure here is reported as a compilation error for the pair.
    fn emit(&self, cx: &RuleContext<'_>, tuple: TypeTuple, kind: MapKind) -> MapResult<Converter>;
}

/// Ordered rule chain. Cloning is O(1).
#[derive(Clone)]
pub struct RuleSet {
    rules: Arc<Vec<Arc<dyn MappingRule>>>,
}

impl RuleSet {
    /// Chain with no rules at all.
    pub fn empty() -> Self {
        Self {
            rules: Arc::new(Vec::new()),
        }
    }

    /// Chain with every built-in rule.
    pub fn builtin() -> Self {
        let mut set = Self::empty();
        set.add(Arc::new(IdentityRule));
        set.add(Arc::new(NullableRule));
        set.add(Arc::new(EnumRule));
        set.add(Arc::new(PrimitiveRule));
        set.add(Arc::new(SequenceRule));
        set.add(Arc::new(DictionaryRule));
        set.add(Arc::new(RecordRule));
        set
    }

    pub fn add(&mut self, rule: Arc<dyn MappingRule>) {
        let rules = Arc::make_mut(&mut self.rules);
        rules.push(rule);
        // Stable: equal priorities stay in registration order.
        rules.sort_by_key(|r| r.priority());
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn MappingRule> {
        self.rules.iter().map(AsRef::as_ref)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(MappingRule::name).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

/// What a rule sees while it decides and emits.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    pub pool: &'a TypePool,
    pub config: &'a MapperConfig,
    rules: &'a RuleSet,
}

impl<'a> RuleContext<'a> {
    pub fn new(pool: &'a TypePool, config: &'a MapperConfig, rules: &'a RuleSet) -> Self {
        Self {
            pool,
            config,
            rules,
        }
    }

    /// First rule accepting `tuple`.
    pub fn find(&self, tuple: TypeTuple, kind: MapKind) -> Option<&'a dyn MappingRule> {
        self.rules.iter().find(|rule| rule.can_handle(self, tuple, kind))
    }

    pub fn can_convert(&self, from: TypeId, to: TypeId, kind: MapKind) -> bool {
        ensure_sufficient_stack(|| self.find(TypeTuple::new(from, to), kind).is_some())
    }

    /// Converter for `from → to`; `None` when no rule handles the pair.
    pub fn try_converter(
        &self,
        from: TypeId,
        to: TypeId,
        kind: MapKind,
    ) -> MapResult<Option<Converter>> {
        let tuple = TypeTuple::new(from, to);
        let Some(rule) = self.find(tuple, kind) else {
            return Ok(None);
        };
        tracing::trace!(rule = rule.name(), pair = %self.pool.pair(tuple), "rule selected");
        ensure_sufficient_stack(|| rule.emit(self, tuple, kind))
            .map(Some)
            .map_err(|e| MapError::compilation(self.pool.pair(tuple), tuple, kind, e))
    }

    /// Converter for `from → to`; no handling rule is a configuration error.
    pub fn converter(&self, from: TypeId, to: TypeId, kind: MapKind) -> MapResult<Converter> {
        self.try_converter(from, to, kind)?.ok_or_else(|| {
            MapError::configuration(
                self.pool.pair(TypeTuple::new(from, to)),
                "no mapping rule handles this pair",
            )
        })
    }
}
