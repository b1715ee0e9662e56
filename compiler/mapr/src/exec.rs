//! Transform execution.
//!
//! The `Executor` is the generic driver for compiled plans: it constructs
//! destinations, reads bound sources by layout index, runs converters, and
//! applies the depth limit and reference map of the active `MappingContext`.
//! It implements `MapScope`, so resolvers, factories and custom converters
//! map nested values through the same context.

mod frame;

use smallvec::SmallVec;

use mapr_convert::convert_scalar;
use mapr_ir::{
    ensure_sufficient_stack, MapError, MapKind, MapResult, ObjectRef, RecursionLimitReached,
    TypeId, TypeTuple, Value,
};
use mapr_plan::{
    collect_map, collect_seq, empty_collection, Condition, Construction, Converter, MapScope,
    MappingPlan, MemberBinding, MemberResolver, Parameter, PendingTask, SourceAccess, StepAccess,
};

use mapr_types::TypePool;

use crate::cache::{CompiledTransform, TransformBody};
use crate::context::MappingContext;
use crate::Mapper;

pub(crate) struct Executor<'m, 'c> {
    mapper: &'m Mapper,
    cx: &'c mut MappingContext,
    /// Record tuples being populated, outermost first.
    active: SmallVec<[TypeTuple; 8]>,
}

fn type_name(mapper: &Mapper, value: &Value) -> String {
    value
        .runtime_type()
        .map_or_else(|| "null".to_owned(), |t| mapper.pool().format_type(t))
}

/// Write one bound member; a slot missing from `dest` is a configuration
/// error, never a silently dropped value.
fn store(
    pool: &TypePool,
    plan: &MappingPlan,
    binding: &MemberBinding,
    dest: &ObjectRef,
    value: Value,
) -> MapResult<()> {
    if dest.set(binding.target.field(), value) {
        return Ok(());
    }
    Err(MapError::member_configuration(
        pool.pair(plan.tuple),
        pool.lookup_name(binding.member),
        format!(
            "destination {} has no slot {}",
            pool.format_type(dest.ty()),
            binding.target.field()
        ),
    ))
}

impl<'m, 'c> Executor<'m, 'c> {
    pub(crate) fn new(mapper: &'m Mapper, cx: &'c mut MappingContext) -> Self {
        Self {
            mapper,
            cx,
            active: SmallVec::new(),
        }
    }

    fn current_pair(&self) -> String {
        self.active
            .last()
            .map_or_else(|| "<root>".to_owned(), |&t| self.mapper.pool().pair(t))
    }

    /// Run `transform` on `source`. `existing` is the destination instance
    /// for map-to-existing transforms.
    pub(crate) fn run(
        &mut self,
        transform: &CompiledTransform,
        source: &Value,
        existing: Option<ObjectRef>,
    ) -> MapResult<Value> {
        match &transform.body {
            TransformBody::Plan(plan) => match source {
                Value::Object(obj) => self.map_object(plan.tuple, plan.kind, obj, existing),
                Value::Null => Ok(existing.map_or(Value::Null, Value::Object)),
                other => Err(MapError::conversion(
                    type_name(self.mapper, other),
                    self.mapper.pool().format_type(plan.tuple.dest),
                    format!("{other:?}"),
                    "record transform applied to a non-record value",
                )),
            },
            TransformBody::Value(converter) => {
                self.convert(converter, source, transform.tuple().dest)
            }
            TransformBody::Projection(expr) => expr.evaluate(self.mapper.pool(), source),
        }
    }

    /// Map one record instance through the plan for its runtime type.
    fn map_object(
        &mut self,
        declared: TypeTuple,
        kind: MapKind,
        source: &ObjectRef,
        existing: Option<ObjectRef>,
    ) -> MapResult<Value> {
        let tuple = TypeTuple::new(source.ty(), declared.dest);
        let transform = self.mapper.transform(tuple.source, tuple.dest, kind)?;
        let Some(plan) = transform.plan() else {
            return Err(MapError::configuration(
                self.mapper.pool().pair(tuple),
                "transform is not a record plan",
            ));
        };

        if plan.preserve_references {
            if let Some(hit) = self.cx.reference(source, tuple.dest) {
                tracing::trace!(pair = %self.mapper.pool().pair(tuple), "preserved reference reused");
                return Ok(Value::Object(hit));
            }
        }
        if let Some(max_depth) = plan.max_depth {
            if self.cx.depth(tuple) >= max_depth {
                let pair = self.mapper.pool().pair(tuple);
                tracing::debug!(%pair, max_depth, "recursion limit reached; value truncated");
                self.cx.record_truncation(RecursionLimitReached {
                    pair,
                    tuple,
                    max_depth,
                });
                return Ok(existing.map_or(Value::Null, Value::Object));
            }
        }

        let mut frame = self.enter(tuple);
        ensure_sufficient_stack(|| frame.populate(plan, source, existing))
    }

    fn populate(
        &mut self,
        plan: &MappingPlan,
        source: &ObjectRef,
        existing: Option<ObjectRef>,
    ) -> MapResult<Value> {
        let pool = self.mapper.pool();
        let dest = match &plan.construction {
            Construction::Existing => existing.ok_or_else(|| {
                MapError::configuration(pool.pair(plan.tuple), "no destination instance supplied")
            })?,
            Construction::Default => pool.new_object(plan.tuple.dest)?,
            Construction::Constructor { .. } => {
                let obj = pool.new_object(plan.tuple.dest)?;
                for binding in plan.ctor_bindings() {
                    let value = match self.bind(plan, binding, source, None)? {
                        Some(value) => value,
                        None => pool.default_value(binding.dest_ty),
                    };
                    store(pool, plan, binding, &obj, value)?;
                }
                obj
            }
            Construction::Factory(factory) => {
                let obj = factory(source, self)?;
                if obj.ty() != plan.tuple.dest {
                    return Err(MapError::configuration(
                        pool.pair(plan.tuple),
                        format!("factory returned {}", pool.format_type(obj.ty())),
                    ));
                }
                obj
            }
        };
        if plan.preserve_references {
            self.cx.remember(source, plan.tuple.dest, &dest);
        }

        for hook in &plan.hooks.before_map {
            hook(source, &dest)?;
        }
        let into_existing = plan.kind == MapKind::MapToExisting;
        for binding in plan.field_bindings() {
            let field = binding.target.field();
            let current = if into_existing {
                dest.get(field).as_object().cloned()
            } else {
                None
            };
            if let Some(value) = self.bind(plan, binding, source, current)? {
                store(pool, plan, binding, &dest, value)?;
            }
        }
        for hook in &plan.hooks.after_map {
            hook(source, &dest)?;
        }
        if !plan.hooks.after_map_async.is_empty() {
            if !self.cx.is_async() {
                return Err(MapError::async_usage(pool.pair(plan.tuple)));
            }
            for hook in &plan.hooks.after_map_async {
                let task = hook(source, &dest);
                self.enqueue(task)?;
            }
        }
        Ok(Value::Object(dest))
    }

    /// Value for one binding, or `None` when its condition rejects the
    /// source.
    fn bind(
        &mut self,
        plan: &MappingPlan,
        binding: &MemberBinding,
        source: &ObjectRef,
        current: Option<ObjectRef>,
    ) -> MapResult<Option<Value>> {
        let pool = self.mapper.pool();
        if let Some(condition) = &binding.condition {
            let pass = match condition {
                Condition::Fn(f) => f(source),
                Condition::Expr(e) => {
                    matches!(e.evaluate(pool, &Value::Object(source.clone()))?, Value::Bool(true))
                }
            };
            if !pass {
                tracing::trace!(
                    pair = %pool.pair(plan.tuple),
                    member = pool.lookup_name(binding.member),
                    "condition rejected member"
                );
                return Ok(None);
            }
        }

        let raw = self.read(binding, source)?;
        let value = match (&raw, current, binding.converter.unwrapped()) {
            (Value::Object(nested), Some(current), Converter::Nested(tuple)) => {
                self.map_object(*tuple, MapKind::MapToExisting, nested, Some(current))?
            }
            _ => self.convert(&binding.converter, &raw, binding.dest_ty)?,
        };
        match &binding.post_transform {
            Some(post) => post(value).map(Some),
            None => Ok(Some(value)),
        }
    }

    fn read(&mut self, binding: &MemberBinding, source: &ObjectRef) -> MapResult<Value> {
        match &binding.source {
            SourceAccess::Path(steps) => {
                let mut current = Value::Object(source.clone());
                for step in steps {
                    let obj = match current {
                        Value::Object(obj) => obj,
                        Value::Null => return Ok(Value::Null),
                        other => {
                            return Err(MapError::conversion(
                                type_name(self.mapper, &other),
                                "record",
                                format!("{other:?}"),
                                format!(
                                    "cannot read `{}` from a non-record value",
                                    self.mapper.pool().lookup_name(step.name)
                                ),
                            ))
                        }
                    };
                    current = match &step.access {
                        StepAccess::Field(index) => obj.get(*index),
                        StepAccess::Method(method) => method.call(&obj),
                    };
                }
                Ok(current)
            }
            SourceAccess::Resolver(MemberResolver::Fn(resolve)) => resolve(source, self),
            SourceAccess::Resolver(MemberResolver::Expr(expr)) => {
                expr.evaluate(self.mapper.pool(), &Value::Object(source.clone()))
            }
        }
    }

    fn convert(&mut self, converter: &Converter, value: &Value, dest: TypeId) -> MapResult<Value> {
        let pool = self.mapper.pool();
        match converter {
            Converter::Identity => Ok(value.clone()),
            Converter::Primitive(to) | Converter::Enum(to) => convert_scalar(pool, value, *to),
            Converter::Nullable(inner) => {
                if value.is_null() {
                    return Ok(Value::Null);
                }
                self.convert(inner, value, pool.strip_nullable(dest))
            }
            Converter::Dynamic(to) => self.map_value(value, *to),
            Converter::Seq {
                kind,
                dest: seq_ty,
                elem_ty,
                elem,
            } => match value {
                Value::Null => Ok(self.null_collection(*seq_ty)),
                Value::Seq(seq) => {
                    let mut items = Vec::with_capacity(seq.len());
                    for item in seq.iter() {
                        items.push(self.convert(elem, item, *elem_ty)?);
                    }
                    Ok(collect_seq(*kind, *seq_ty, items))
                }
                other => Err(self.not_a_collection(other, *seq_ty)),
            },
            Converter::Map {
                dest: map_ty,
                key_ty,
                key,
                value_ty,
                value: value_conv,
            } => match value {
                Value::Null => Ok(self.null_collection(*map_ty)),
                Value::Map(map) => {
                    let mut entries = Vec::with_capacity(map.len());
                    for (k, v) in map.iter() {
                        entries.push((
                            self.convert(key, k, *key_ty)?,
                            self.convert(value_conv, v, *value_ty)?,
                        ));
                    }
                    Ok(collect_map(*map_ty, entries))
                }
                other => Err(self.not_a_collection(other, *map_ty)),
            },
            Converter::Nested(tuple) => match value {
                Value::Null => Ok(Value::Null),
                Value::Object(obj) => self.map_object(*tuple, MapKind::ConstructNew, obj, None),
                other => Err(MapError::conversion(
                    type_name(self.mapper, other),
                    pool.format_type(tuple.dest),
                    format!("{other:?}"),
                    "expected a record instance",
                )),
            },
            Converter::Custom(custom) => (custom.convert)(value, self),
        }
    }

    fn null_collection(&self, ty: TypeId) -> Value {
        if self.mapper.config().allow_null_collections {
            Value::Null
        } else {
            empty_collection(self.mapper.pool(), ty)
        }
    }

    fn not_a_collection(&self, value: &Value, to: TypeId) -> MapError {
        MapError::conversion(
            type_name(self.mapper, value),
            self.mapper.pool().format_type(to),
            format!("{value:?}"),
            "expected a collection",
        )
    }
}

impl MapScope for Executor<'_, '_> {
    fn map_value(&mut self, value: &Value, dest: TypeId) -> MapResult<Value> {
        let Some(from) = value.runtime_type() else {
            let pool = self.mapper.pool();
            return Ok(if pool.is_nullable(dest) {
                Value::Null
            } else {
                pool.default_value(dest)
            });
        };
        let transform = self.mapper.transform(from, dest, MapKind::ConstructNew)?;
        self.run(&transform, value, None)
    }

    fn parameter(&self, name: &str) -> Option<Parameter> {
        self.cx.parameter(name)
    }

    fn enqueue(&mut self, task: PendingTask) -> MapResult<()> {
        if self.cx.enqueue(task).is_err() {
            return Err(MapError::async_usage(self.current_pair()));
        }
        Ok(())
    }
}
