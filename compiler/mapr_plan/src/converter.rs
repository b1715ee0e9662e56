//! Value converters: what a mapping rule emits for one value conversion.
//!
//! A converter is resolved once at plan time and interpreted by the executor
//! (or lowered to an `Expr` for projections). Nested record conversions are
//! referenced by type tuple rather than embedded, so cyclic schemas produce
//! finite converter trees.

use std::fmt;
use std::sync::Arc;

use mapr_ir::{MapResult, TypeId, TypeTuple, Value};
use mapr_types::SeqKind;

use crate::projection::Expr;
use crate::scope::MapScope;

/// Body of a converter emitted by a user rule.
pub type CustomFn = Arc<dyn Fn(&Value, &mut dyn MapScope) -> MapResult<Value> + Send + Sync>;

/// Expression form of a custom converter, used by projections.
pub type ProjectFn = Arc<dyn Fn(Expr) -> Expr + Send + Sync>;

/// Converter contributed by a user rule.
#[derive(Clone)]
pub struct CustomConverter {
    /// Name of the rule that emitted it.
    pub rule: &'static str,
    pub convert: CustomFn,
    /// Without this, the converter cannot appear in a projection.
    pub project: Option<ProjectFn>,
}

impl CustomConverter {
    pub fn new<F>(rule: &'static str, convert: F) -> Self
    where
        F: Fn(&Value, &mut dyn MapScope) -> MapResult<Value> + Send + Sync + 'static,
    {
        Self {
            rule,
            convert: Arc::new(convert),
            project: None,
        }
    }

    #[must_use]
    pub fn with_projection<F>(mut self, project: F) -> Self
    where
        F: Fn(Expr) -> Expr + Send + Sync + 'static,
    {
        self.project = Some(Arc::new(project));
        self
    }
}

impl fmt::Debug for CustomConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomConverter")
            .field("rule", &self.rule)
            .field("projectable", &self.project.is_some())
            .finish_non_exhaustive()
    }
}

/// One compiled value conversion.
#[derive(Clone, Debug)]
pub enum Converter {
    /// Pass the value through unchanged.
    Identity,
    /// Scalar conversion into the given primitive type.
    Primitive(TypeId),
    /// Conversion into or out of an enum type.
    Enum(TypeId),
    /// Destination admits `Null`; non-null values go through the inner
    /// converter.
    Nullable(Box<Converter>),
    /// Convert by the value's runtime type when it is only known at
    /// execution time (resolver results).
    Dynamic(TypeId),
    Seq {
        kind: SeqKind,
        dest: TypeId,
        elem_ty: TypeId,
        elem: Box<Converter>,
    },
    Map {
        dest: TypeId,
        key_ty: TypeId,
        key: Box<Converter>,
        value_ty: TypeId,
        value: Box<Converter>,
    },
    /// Record to record, through the compiled transform for the tuple.
    Nested(TypeTuple),
    Custom(CustomConverter),
}

impl Converter {
    /// Identity, scalar and nullable-scalar conversions: the ones a
    /// same-name member binds directly.
    pub fn is_simple(&self) -> bool {
        match self {
            Converter::Identity | Converter::Primitive(_) | Converter::Enum(_) => true,
            Converter::Nullable(inner) => inner.is_simple(),
            _ => false,
        }
    }

    /// The converter with any `Nullable` wrappers removed.
    pub fn unwrapped(&self) -> &Converter {
        match self {
            Converter::Nullable(inner) => inner.unwrapped(),
            other => other,
        }
    }

    /// Record tuples this converter reaches, in first-seen order.
    pub fn dependencies(&self, out: &mut Vec<TypeTuple>) {
        match self {
            Converter::Nested(tuple) => {
                if !out.contains(tuple) {
                    out.push(*tuple);
                }
            }
            Converter::Nullable(inner) => inner.dependencies(out),
            Converter::Seq { elem, .. } => elem.dependencies(out),
            Converter::Map { key, value, .. } => {
                key.dependencies(out);
                value.dependencies(out);
            }
            Converter::Identity
            | Converter::Primitive(_)
            | Converter::Enum(_)
            | Converter::Dynamic(_)
            | Converter::Custom(_) => {}
        }
    }
}
