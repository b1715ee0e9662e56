//! Mapping plans: the immutable result of planning one record pair.

use std::fmt;

use smallvec::SmallVec;

use mapr_ir::{MapKind, Name, TypeId, TypeTuple};
use mapr_types::MethodDef;

use crate::config::{AsyncHookFn, Condition, FactoryFn, HookFn, MemberResolver, PostTransformFn};
use crate::converter::Converter;

/// How a destination member was bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    DirectGet,
    FlattenPath,
    FlattenMethod,
    CustomResolver,
    CollectionElementAdapt,
    NestedAdapt,
}

/// How one step of a source path is read.
#[derive(Clone, Debug)]
pub enum StepAccess {
    Field(usize),
    Method(MethodDef),
}

/// One segment of a source path.
#[derive(Clone, Debug)]
pub struct PathStep {
    pub name: Name,
    /// Type of the value this step yields.
    pub ty: TypeId,
    pub access: StepAccess,
}

impl PathStep {
    pub fn is_method(&self) -> bool {
        matches!(self.access, StepAccess::Method(_))
    }
}

/// Where a member's value comes from.
#[derive(Clone, Debug)]
pub enum SourceAccess {
    /// Walk from the source object; a `Null` midway yields `Null`.
    Path(SmallVec<[PathStep; 2]>),
    Resolver(MemberResolver),
}

/// Where a member's value goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingTarget {
    Field(usize),
    /// Constructor argument `param`, which initializes `field`.
    CtorParam { param: usize, field: usize },
}

impl BindingTarget {
    /// Layout index of the field written.
    pub fn field(self) -> usize {
        match self {
            BindingTarget::Field(field) | BindingTarget::CtorParam { field, .. } => field,
        }
    }
}

/// One destination member and how to fill it.
#[derive(Clone)]
pub struct MemberBinding {
    pub member: Name,
    pub target: BindingTarget,
    pub dest_ty: TypeId,
    pub source: SourceAccess,
    /// Static type read from the source; `ANY` for resolvers.
    pub source_ty: TypeId,
    pub converter: Converter,
    pub condition: Option<Condition>,
    pub post_transform: Option<PostTransformFn>,
}

impl MemberBinding {
    pub fn strategy(&self) -> Strategy {
        let SourceAccess::Path(steps) = &self.source else {
            return Strategy::CustomResolver;
        };
        if steps.iter().any(PathStep::is_method) {
            return Strategy::FlattenMethod;
        }
        if steps.len() > 1 {
            return Strategy::FlattenPath;
        }
        match self.converter.unwrapped() {
            Converter::Seq { .. } | Converter::Map { .. } => Strategy::CollectionElementAdapt,
            Converter::Nested(_) => Strategy::NestedAdapt,
            _ => Strategy::DirectGet,
        }
    }
}

impl fmt::Debug for MemberBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberBinding")
            .field("member", &self.member)
            .field("target", &self.target)
            .field("dest_ty", &self.dest_ty)
            .field("source", &self.source)
            .field("converter", &self.converter)
            .field("condition", &self.condition)
            .field("post_transform", &self.post_transform.is_some())
            .finish()
    }
}

/// How the destination instance comes into being.
#[derive(Clone)]
pub enum Construction {
    /// Parameterless constructor.
    Default,
    /// Parameterized constructor fed by the `CtorParam` bindings.
    Constructor { arity: usize },
    Factory(FactoryFn),
    /// Caller supplies the instance.
    Existing,
}

impl fmt::Debug for Construction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Construction::Default => f.write_str("Default"),
            Construction::Constructor { arity } => write!(f, "Constructor({arity})"),
            Construction::Factory(_) => f.write_str("Factory(..)"),
            Construction::Existing => f.write_str("Existing"),
        }
    }
}

/// Hooks copied from the pair configuration.
#[derive(Clone, Default)]
pub struct PlanHooks {
    pub before_map: Vec<HookFn>,
    pub after_map: Vec<HookFn>,
    pub after_map_async: Vec<AsyncHookFn>,
}

impl PlanHooks {
    pub fn is_empty(&self) -> bool {
        self.before_map.is_empty() && self.after_map.is_empty() && self.after_map_async.is_empty()
    }
}

/// Ordered member bindings for one `(tuple, kind)`. Immutable once built.
#[derive(Clone)]
pub struct MappingPlan {
    pub tuple: TypeTuple,
    pub kind: MapKind,
    pub construction: Construction,
    /// Constructor parameters first, then fields, in declaration order.
    pub bindings: Vec<MemberBinding>,
    /// Destination members left without a source.
    pub unmapped: Vec<Name>,
    pub hooks: PlanHooks,
    pub max_depth: Option<u32>,
    pub preserve_references: bool,
}

impl MappingPlan {
    pub fn binding(&self, member: Name) -> Option<&MemberBinding> {
        self.bindings.iter().find(|b| b.member == member)
    }

    /// Record tuples this plan maps through.
    pub fn dependencies(&self) -> Vec<TypeTuple> {
        let mut out = Vec::new();
        for binding in &self.bindings {
            binding.converter.dependencies(&mut out);
        }
        out
    }

    pub fn ctor_bindings(&self) -> impl Iterator<Item = &MemberBinding> {
        self.bindings
            .iter()
            .filter(|b| matches!(b.target, BindingTarget::CtorParam { .. }))
    }

    pub fn field_bindings(&self) -> impl Iterator<Item = &MemberBinding> {
        self.bindings
            .iter()
            .filter(|b| matches!(b.target, BindingTarget::Field(_)))
    }
}

impl fmt::Debug for MappingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingPlan")
            .field("tuple", &self.tuple)
            .field("kind", &self.kind)
            .field("construction", &self.construction)
            .field("bindings", &self.bindings)
            .field("unmapped", &self.unmapped)
            .field("max_depth", &self.max_depth)
            .field("preserve_references", &self.preserve_references)
            .finish_non_exhaustive()
    }
}
