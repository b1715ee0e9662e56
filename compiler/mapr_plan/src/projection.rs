//! Projection compilation: a mapping plan lowered to one pure expression.
//!
//! Nested record plans are inlined (guarded by a null check), collections
//! become `Select`, and resolvers and conditions must be expressions. Anything
//! opaque (closure resolvers, conditions, post-transforms, factories, custom
//! converters without an expression form) fails compilation, naming the
//! member responsible. Hooks are not part of a projection and are skipped.
//!
//! A type that reaches itself can only be projected with a max depth: the
//! expression is unrolled to that depth and ends in `null`.

mod eval;
mod expr;
mod render;

pub use expr::{Expr, FieldInit};

use mapr_convert::is_scalar;
use mapr_ir::{ensure_sufficient_stack, MapError, MapKind, MapResult, TypeId, TypeTuple, Value};

use crate::collections::empty_collection;
use crate::config::{Condition, MemberResolver};
use crate::converter::Converter;
use crate::plan::{BindingTarget, Construction, MappingPlan, SourceAccess, StepAccess};
use crate::planner::Planner;

/// Compile the projection for `tuple` as an expression over `Expr::Source`.
#[tracing::instrument(level = "debug", skip_all, fields(pair = %planner.pool().pair(tuple)))]
pub fn compile_projection(planner: &Planner<'_>, tuple: TypeTuple) -> MapResult<Expr> {
    let kind = MapKind::Projection;
    let converter = planner.converter(tuple, kind)?;
    let mut compiler = ProjectionCompiler {
        planner,
        root: tuple,
        active: Vec::new(),
        next_var: 0,
    };
    let expr = compiler
        .value(&converter, Expr::Source, tuple.dest)
        .map_err(|e| MapError::compilation(planner.pool().pair(tuple), tuple, kind, e))?;
    tracing::debug!(nodes = expr.node_count(), "projection compiled");
    Ok(expr)
}

struct ProjectionCompiler<'p, 'a> {
    planner: &'p Planner<'a>,
    root: TypeTuple,
    /// Record tuples currently being inlined, outermost first.
    active: Vec<TypeTuple>,
    next_var: u32,
}

impl ProjectionCompiler<'_, '_> {
    fn current(&self) -> TypeTuple {
        self.active.last().copied().unwrap_or(self.root)
    }

    fn fail(&self, message: impl Into<String>) -> MapError {
        let tuple = self.current();
        MapError::compilation_message(
            self.planner.pool().pair(tuple),
            tuple,
            MapKind::Projection,
            message,
        )
    }

    fn value(&mut self, converter: &Converter, value: Expr, dest: TypeId) -> MapResult<Expr> {
        ensure_sufficient_stack(|| self.value_inner(converter, value, dest))
    }

    fn value_inner(&mut self, converter: &Converter, value: Expr, dest: TypeId) -> MapResult<Expr> {
        let pool = self.planner.pool();
        match converter {
            Converter::Identity => Ok(value),
            Converter::Primitive(to) | Converter::Enum(to) => Ok(value.convert(*to)),
            Converter::Dynamic(to) => Ok(if is_scalar(pool, *to) {
                value.convert(*to)
            } else {
                value
            }),
            Converter::Nullable(inner) => {
                let body = self.value(inner, value.clone(), pool.strip_nullable(dest))?;
                Ok(Expr::conditional(
                    value.is_null(),
                    Expr::Literal(Value::Null),
                    body,
                ))
            }
            Converter::Seq {
                dest: seq_ty,
                elem_ty,
                elem,
                ..
            } => {
                let var = self.next_var;
                self.next_var += 1;
                let body = self.value(elem, Expr::Element(var), *elem_ty)?;
                let select = Expr::Select {
                    source: Box::new(value),
                    var,
                    body: Box::new(body),
                    into: *seq_ty,
                };
                Ok(if self.planner.config().allow_null_collections {
                    select
                } else {
                    select.coalesce(Expr::Literal(empty_collection(pool, *seq_ty)))
                })
            }
            Converter::Map { dest, .. } => Err(self.fail(format!(
                "dictionary type {} cannot be projected",
                pool.format_type(*dest)
            ))),
            Converter::Nested(tuple) => self.nested(*tuple, value),
            Converter::Custom(custom) => match &custom.project {
                Some(project) => Ok(project(value)),
                None => Err(self.fail(format!(
                    "converter from rule `{}` has no expression form",
                    custom.rule
                ))),
            },
        }
    }

    fn nested(&mut self, tuple: TypeTuple, value: Expr) -> MapResult<Expr> {
        let plan = self.planner.plan(tuple, MapKind::Projection)?;
        let depth = self.active.iter().filter(|&&t| t == tuple).count();
        if depth > 0 {
            match plan.max_depth {
                None => {
                    return Err(self.fail(format!(
                        "{} reaches itself; set a max depth to project it",
                        self.planner.pool().pair(tuple)
                    )))
                }
                Some(max) if depth >= max as usize => {
                    tracing::debug!(pair = %self.planner.pool().pair(tuple), depth, "projection truncated");
                    return Ok(Expr::Literal(Value::Null));
                }
                Some(_) => {}
            }
        }

        self.active.push(tuple);
        let body = self.plan(&plan, &value);
        self.active.pop();
        Ok(Expr::conditional(
            value.is_null(),
            Expr::Literal(Value::Null),
            body?,
        ))
    }

    fn plan(&mut self, plan: &MappingPlan, src: &Expr) -> MapResult<Expr> {
        let pool = self.planner.pool();
        if !plan.hooks.is_empty() {
            tracing::debug!(pair = %pool.pair(plan.tuple), "mapping hooks are not applied to projections");
        }
        if let Construction::Factory(_) = plan.construction {
            return Err(self.fail("a construction factory cannot be projected"));
        }

        let mut ctor = Vec::new();
        let mut inits = Vec::new();
        for binding in &plan.bindings {
            let member = pool.lookup_name(binding.member);
            let read = match &binding.source {
                SourceAccess::Path(steps) => steps.iter().fold(src.clone(), |of, step| {
                    match &step.access {
                        StepAccess::Field(index) => Expr::Member {
                            of: Box::new(of),
                            name: step.name,
                            index: *index,
                        },
                        StepAccess::Method(method) => Expr::Call {
                            of: Box::new(of),
                            method: method.clone(),
                        },
                    }
                }),
                SourceAccess::Resolver(MemberResolver::Expr(e)) => e.with_source(src),
                SourceAccess::Resolver(MemberResolver::Fn(_)) => {
                    return Err(self.fail(format!(
                        "member `{member}` uses a resolver closure; register an expression resolver to project it"
                    )));
                }
            };
            if binding.post_transform.is_some() {
                return Err(self.fail(format!(
                    "member `{member}` has a post-transform closure, which cannot be projected"
                )));
            }

            let mut value = self.value(&binding.converter, read, binding.dest_ty)?;
            match &binding.condition {
                None => {}
                Some(Condition::Expr(test)) => {
                    value = Expr::conditional(
                        test.with_source(src),
                        value,
                        Expr::Literal(pool.default_value(binding.dest_ty)),
                    );
                }
                Some(Condition::Fn(_)) => {
                    return Err(self.fail(format!(
                        "member `{member}` has a condition closure; register an expression condition to project it"
                    )));
                }
            }

            let init = FieldInit {
                name: binding.member,
                index: binding.target.field(),
                value,
            };
            match binding.target {
                BindingTarget::CtorParam { .. } => ctor.push(init),
                BindingTarget::Field(_) => inits.push(init),
            }
        }
        Ok(Expr::New {
            ty: plan.tuple.dest,
            ctor,
            inits,
        })
    }
}
