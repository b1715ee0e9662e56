//! mapr: a type-to-type mapping compiler.
//!
//! Types are described to the mapper's `TypePool`; the mapper plans each
//! `(source, destination)` pair once, caches the compiled transform, and
//! runs it on every later call. The same plan can be lowered to a pure
//! `Expr` projection.
//!
//! # Architecture
//!
//! - `mapr_ir`: names, type ids, values, errors
//! - `mapr_types`: type pool and member introspection
//! - `mapr_convert`: scalar and enum conversions
//! - `mapr_plan`: configuration, rules, planner, projections
//! - this crate: the cache, per-call context, executor and `Mapper` facade
//!
//! # Tracing
//!
//! Set `RUST_LOG=mapr=debug` and call `init_tracing()` to see plan builds,
//! cache invalidation and depth truncation. `MAPR_LOG_TREE=1` switches to an
//! indented tree view of nested builds.

mod cache;
mod context;
mod exec;
mod mapper;

use std::sync::Once;

pub use cache::{CompiledTransform, TransformBody, TransformCache};
pub use context::MappingContext;
pub use mapper::{Mapper, MapperBuilder, RuleBuilder};

pub use mapr_ir::{
    AsyncUsageError, CompilationError, ConfigurationError, ConversionError, MapError, MapKind,
    MapResult, Name, ObjectRef, RecursionLimitReached, SharedInterner, TransformKey, TypeId,
    TypeTuple, Value,
};
pub use mapr_plan::{
    Converter, CustomConverter, Expr, MapScope, MapperConfig, MappingPlan, MappingRule,
    RuleContext, Strategy,
};
pub use mapr_types::{SeqKind, TypePool};

static TRACING_INIT: Once = Once::new();

/// Install a global tracing subscriber when `RUST_LOG` is set.
///
/// Idempotent; later calls do nothing. Without `RUST_LOG` no subscriber is
/// installed and tracing stays zero-cost.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        if std::env::var("MAPR_LOG_TREE").is_ok_and(|v| v == "1") {
            let _ = tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .with(filter)
                .try_init();
        } else {
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}
