//! Planning for the mapr mapping compiler.
//!
//! - `config`: mapper settings and per-pair directives
//! - `rule`: the `MappingRule` chain that picks a `Converter` per value pair
//! - `planner`: member matching, producing an immutable `MappingPlan`
//! - `projection`: plans lowered to pure `Expr` trees
//! - `scope`: the `MapScope` seam through which plans call back into the
//!   executor
//!
//! Nothing here executes a mapping; see the `mapr` crate.

mod collections;
mod config;
mod converter;
mod plan;
mod planner;
mod projection;
mod rule;
mod scope;

#[cfg(test)]
mod test_helpers;

pub use collections::{collect_map, collect_seq, empty_collection};
pub use config::{
    AsyncHookFn, Condition, ConditionFn, FactoryFn, HookFn, MapperConfig, MemberConfig,
    MemberResolver, PairConfig, PairRegistry, PostTransformFn, ResolverFn,
};
pub use converter::{Converter, CustomConverter, CustomFn, ProjectFn};
pub use plan::{
    BindingTarget, Construction, MappingPlan, MemberBinding, PathStep, PlanHooks, SourceAccess,
    StepAccess, Strategy,
};
pub use planner::Planner;
pub use projection::{compile_projection, Expr, FieldInit};
pub use rule::{
    DictionaryRule, EnumRule, IdentityRule, MappingRule, NullableRule, PrimitiveRule, RecordRule,
    RuleContext, RuleSet, SequenceRule,
};
pub use scope::{MapScope, Parameter, PendingTask};
