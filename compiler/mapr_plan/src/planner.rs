//! Member matching: builds the `MappingPlan` for a record pair.
//!
//! # Binding Order
//!
//! For each destination member, the first step that produces a source wins:
//!
//! 1. Registered resolver for the member.
//! 2. Explicit source path (`map_from`).
//! 3. Same-name source member with an identity or scalar conversion.
//! 4. Path flattening: `AddressCity` walks `Address.City`, one word at a time.
//! 5. Method flattening: `Total` reads `GetTotal()`, `CustomerTotal` reads
//!    `Customer.GetTotal()`.
//! 6. Same-name source member adapted as a nested record or collection.
//!
//! Members with no source are recorded as unmapped, or rejected in strict
//! mode. Constructor parameters with no source are always rejected.

use smallvec::{smallvec, SmallVec};

use mapr_ir::{ensure_sufficient_stack, MapError, MapKind, MapResult, TypeId, TypeTuple};
use mapr_types::{
    names_match, split_words, DirectiveMap, Introspector, MemberDescriptor, MemberKind,
    RecordDef, TypeDescriptor, TypePool,
};

use crate::config::{MapperConfig, MemberConfig, PairConfig, PairRegistry};
use crate::converter::Converter;
use crate::plan::{
    BindingTarget, Construction, MappingPlan, MemberBinding, PathStep, PlanHooks, SourceAccess,
    StepAccess,
};
use crate::rule::{RuleContext, RuleSet};

type Steps = SmallVec<[PathStep; 2]>;

/// A resolved source for one destination member.
struct SourceMatch {
    source: SourceAccess,
    ty: TypeId,
    converter: Converter,
}

/// Builds plans and converters from the registered configuration.
#[derive(Clone, Copy)]
pub struct Planner<'a> {
    pool: &'a TypePool,
    config: &'a MapperConfig,
    pairs: &'a PairRegistry,
    rules: &'a RuleSet,
    introspector: &'a Introspector,
}

impl<'a> Planner<'a> {
    pub fn new(
        pool: &'a TypePool,
        config: &'a MapperConfig,
        pairs: &'a PairRegistry,
        rules: &'a RuleSet,
        introspector: &'a Introspector,
    ) -> Self {
        Self {
            pool,
            config,
            pairs,
            rules,
            introspector,
        }
    }

    pub fn pool(&self) -> &'a TypePool {
        self.pool
    }

    pub fn config(&self) -> &'a MapperConfig {
        self.config
    }

    pub fn rule_context(&self) -> RuleContext<'a> {
        RuleContext::new(self.pool, self.config, self.rules)
    }

    /// Top-level converter for `tuple`. Record pairs yield
    /// `Converter::Nested(tuple)`, meaning "use the plan".
    pub fn converter(&self, tuple: TypeTuple, kind: MapKind) -> MapResult<Converter> {
        self.rule_context().converter(tuple.source, tuple.dest, kind)
    }

    /// Plan the record pair `tuple`.
    #[tracing::instrument(level = "debug", skip_all, fields(pair = %self.pool.pair(tuple), %kind))]
    pub fn plan(&self, tuple: TypeTuple, kind: MapKind) -> MapResult<MappingPlan> {
        let pool = self.pool;
        let pair_name = pool.pair(tuple);
        let Some(dest_def) = pool.record_def(tuple.dest) else {
            return Err(MapError::configuration(pair_name, "destination is not a record type"));
        };
        if !pool.is_record(tuple.source) {
            return Err(MapError::configuration(pair_name, "source is not a record type"));
        }

        let pair = self.pairs.get(tuple);
        let (directives, revision) = match &pair {
            Some(p) => (p.directives(), p.revision),
            None => (DirectiveMap::default(), 0),
        };
        let dest = self
            .introspector
            .destination(pool, tuple.dest, &directives, revision)?;
        let src = self.introspector.source(pool, tuple.source);
        let construction = self.construction(&pair_name, kind, pair.as_deref(), &dest, &dest_def)?;
        let uses_ctor = matches!(construction, Construction::Constructor { .. });
        let cx = self.rule_context();

        let mut bindings = Vec::with_capacity(dest.members.len());
        let mut unmapped = Vec::new();
        for member in &dest.members {
            if member.directives.ignored {
                continue;
            }
            let target = match member.kind {
                MemberKind::CtorParam { param, field } if uses_ctor => {
                    BindingTarget::CtorParam { param, field }
                }
                // Built some other way: constructor-only fields are out of reach.
                MemberKind::CtorParam { field, .. } => {
                    if !dest_def.fields.get(field).is_some_and(|f| f.writable) {
                        continue;
                    }
                    BindingTarget::Field(field)
                }
                MemberKind::Field(index) => BindingTarget::Field(index),
                MemberKind::Method(_) => continue,
            };
            let config = pair.as_deref().and_then(|p| p.member(member.name));

            match self.bind(&cx, tuple, &src, member, config, kind)? {
                Some(found) => bindings.push(MemberBinding {
                    member: member.name,
                    target,
                    dest_ty: member.ty,
                    source: found.source,
                    source_ty: found.ty,
                    converter: found.converter,
                    condition: config.and_then(|c| c.condition.clone()),
                    post_transform: config.and_then(|c| c.post_transform.clone()),
                }),
                None if matches!(target, BindingTarget::CtorParam { .. }) => {
                    return Err(MapError::member_configuration(
                        pair_name,
                        pool.lookup_name(member.name),
                        "constructor parameter has no matching source member",
                    ));
                }
                None if self.config.require_destination_member_source => {
                    return Err(MapError::member_configuration(
                        pair_name,
                        pool.lookup_name(member.name),
                        "destination member has no source",
                    ));
                }
                None => {
                    tracing::warn!(
                        pair = %pair_name,
                        member = pool.lookup_name(member.name),
                        "destination member has no source"
                    );
                    unmapped.push(member.name);
                }
            }
        }

        let hooks = pair.as_deref().map_or_else(PlanHooks::default, |p| PlanHooks {
            before_map: p.before_map.clone(),
            after_map: p.after_map.clone(),
            after_map_async: p.after_map_async.clone(),
        });
        let plan = MappingPlan {
            tuple,
            kind,
            construction,
            bindings,
            unmapped,
            hooks,
            max_depth: pair
                .as_deref()
                .and_then(|p| p.max_depth)
                .or(self.config.max_depth),
            preserve_references: pair
                .as_deref()
                .and_then(|p| p.preserve_references)
                .unwrap_or(self.config.preserve_references),
        };
        tracing::debug!(
            bindings = plan.bindings.len(),
            unmapped = plan.unmapped.len(),
            "planned"
        );
        Ok(plan)
    }

    fn construction(
        &self,
        pair_name: &str,
        kind: MapKind,
        pair: Option<&PairConfig>,
        dest: &TypeDescriptor,
        def: &RecordDef,
    ) -> MapResult<Construction> {
        if kind == MapKind::MapToExisting {
            return Ok(Construction::Existing);
        }
        if let Some(factory) = pair.and_then(|p| p.factory.clone()) {
            return Ok(Construction::Factory(factory));
        }
        if dest.constructs_via_ctor {
            let arity = def.ctor.as_ref().map_or(0, |c| c.params.len());
            return Ok(Construction::Constructor { arity });
        }
        if def.default_constructible {
            return Ok(Construction::Default);
        }
        Err(MapError::configuration(
            pair_name,
            "destination has no parameterless constructor, constructor or factory",
        ))
    }

    fn bind(
        &self,
        cx: &RuleContext<'_>,
        tuple: TypeTuple,
        src: &TypeDescriptor,
        member: &MemberDescriptor,
        config: Option<&MemberConfig>,
        kind: MapKind,
    ) -> MapResult<Option<SourceMatch>> {
        if let Some(resolver) = config.and_then(|c| c.resolver.clone()) {
            return Ok(Some(SourceMatch {
                source: SourceAccess::Resolver(resolver),
                ty: TypeId::ANY,
                converter: Converter::Dynamic(member.ty),
            }));
        }
        if let Some(path) = &member.directives.map_from {
            return self.explicit_path(cx, tuple, src.ty, path, member, kind).map(Some);
        }
        self.match_member(cx, src, member, kind)
    }

    fn match_member(
        &self,
        cx: &RuleContext<'_>,
        src: &TypeDescriptor,
        member: &MemberDescriptor,
        kind: MapKind,
    ) -> MapResult<Option<SourceMatch>> {
        let interner = self.pool.interner();

        let mut adaptable = None;
        // Exact case first, then any casing.
        let same = src
            .members
            .iter()
            .find(|m| m.name == member.name)
            .or_else(|| {
                src.members
                    .iter()
                    .find(|m| interner.eq_ignore_case(m.name, member.name))
            });
        if let Some(same) = same {
            if let Some(converter) = cx.try_converter(same.ty, member.ty, kind)? {
                let found = SourceMatch {
                    source: SourceAccess::Path(smallvec![self.step(src.ty, same)?]),
                    ty: same.ty,
                    converter,
                };
                if found.converter.is_simple() {
                    return Ok(Some(found));
                }
                adaptable = Some(found);
            }
        }

        let words = split_words(interner.lookup(member.name));
        if words.len() > 1 {
            if let Some(found) = self.flatten(cx, src.ty, &words, member.ty, kind, false)? {
                return Ok(Some(found));
            }
        }
        if let Some(found) = self.flatten(cx, src.ty, &words, member.ty, kind, true)? {
            return Ok(Some(found));
        }
        Ok(adaptable)
    }

    /// Walk `words` through the source graph rooted at `ty`.
    ///
    /// Intermediate segments are record-typed fields. With `methods` unset
    /// the leaf is a field; with it set the leaf is a zero-argument method
    /// named after the remaining words, with or without a `Get` prefix.
    fn flatten(
        &self,
        cx: &RuleContext<'_>,
        ty: TypeId,
        words: &[&str],
        dest_ty: TypeId,
        kind: MapKind,
        methods: bool,
    ) -> MapResult<Option<SourceMatch>> {
        ensure_sufficient_stack(|| {
            let interner = self.pool.interner();
            let src = self.introspector.source(self.pool, ty);

            for split in 1..=words.len() {
                let (head, rest) = words.split_at(split);
                if rest.is_empty() {
                    let mut getter: SmallVec<[&str; 5]> = smallvec!["Get"];
                    getter.extend_from_slice(head);
                    for m in &src.members {
                        let name = interner.lookup(m.name);
                        let hit = match m.kind {
                            MemberKind::Field(_) => !methods && names_match(name, head),
                            MemberKind::Method(_) => {
                                methods && (names_match(name, &getter) || names_match(name, head))
                            }
                            MemberKind::CtorParam { .. } => false,
                        };
                        if !hit {
                            continue;
                        }
                        if let Some(converter) = cx.try_converter(m.ty, dest_ty, kind)? {
                            return Ok(Some(SourceMatch {
                                source: SourceAccess::Path(smallvec![self.step(ty, m)?]),
                                ty: m.ty,
                                converter,
                            }));
                        }
                    }
                    continue;
                }

                for m in &src.members {
                    if !matches!(m.kind, MemberKind::Field(_))
                        || !names_match(interner.lookup(m.name), head)
                    {
                        continue;
                    }
                    let inner = self.pool.strip_nullable(m.ty);
                    if !self.pool.is_record(inner) {
                        continue;
                    }
                    if let Some(found) = self.flatten(cx, inner, rest, dest_ty, kind, methods)? {
                        let SourceAccess::Path(tail) = found.source else {
                            continue;
                        };
                        let mut steps: Steps = smallvec![self.step(ty, m)?];
                        steps.extend(tail);
                        return Ok(Some(SourceMatch {
                            source: SourceAccess::Path(steps),
                            ..found
                        }));
                    }
                }
            }
            Ok(None)
        })
    }

    /// Resolve a configured dot-separated source path.
    fn explicit_path(
        &self,
        cx: &RuleContext<'_>,
        tuple: TypeTuple,
        root: TypeId,
        path: &str,
        member: &MemberDescriptor,
        kind: MapKind,
    ) -> MapResult<SourceMatch> {
        let member_name = self.pool.lookup_name(member.name);
        let fail = |message: String| {
            MapError::member_configuration(self.pool.pair(tuple), member_name, message)
        };

        let mut ty = root;
        let mut steps = Steps::new();
        for segment in path.split('.').map(str::trim) {
            let owner = self.pool.strip_nullable(ty);
            let src = self.introspector.source(self.pool, owner);
            let m = src
                .members
                .iter()
                .find(|m| self.pool.lookup_name(m.name).eq_ignore_ascii_case(segment))
                .ok_or_else(|| {
                    fail(format!(
                        "source path `{path}`: `{segment}` is not a readable member of {}",
                        self.pool.format_type(owner)
                    ))
                })?;
            steps.push(self.step(owner, m)?);
            ty = m.ty;
        }

        let converter = cx.try_converter(ty, member.ty, kind)?.ok_or_else(|| {
            fail(format!(
                "source path `{path}` yields {}, which cannot be mapped to {}",
                self.pool.format_type(ty),
                self.pool.format_type(member.ty)
            ))
        })?;
        Ok(SourceMatch {
            source: SourceAccess::Path(steps),
            ty,
            converter,
        })
    }

    fn step(&self, owner: TypeId, m: &MemberDescriptor) -> MapResult<PathStep> {
        let access = match m.kind {
            MemberKind::Field(index) => StepAccess::Field(index),
            MemberKind::Method(index) => {
                let method = self
                    .pool
                    .record_def(owner)
                    .and_then(|def| def.methods.get(index).cloned())
                    .ok_or_else(|| {
                        MapError::configuration(
                            self.pool.format_type(owner),
                            format!("method `{}` not found", self.pool.lookup_name(m.name)),
                        )
                    })?;
                StepAccess::Method(method)
            }
            MemberKind::CtorParam { field, .. } => StepAccess::Field(field),
        };
        Ok(PathStep {
            name: m.name,
            ty: m.ty,
            access,
        })
    }
}
