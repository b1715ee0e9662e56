//! Core vocabulary of the mapr mapping compiler.
//!
//! - `Name` / `NameInterner`: interned member and type names
//! - `TypeId`: handle into a `TypePool` (see `mapr_types`)
//! - `Value` / `ObjectRef`: dynamic instances with reference identity
//! - `TypeTuple`, `MapKind`, `TransformKey`: cache keys
//! - `MapError`: every error kind the compiler raises

mod error;
mod interner;
mod key;
mod name;
mod stack;
mod type_id;
mod value;

pub use error::{
    AsyncUsageError, CompilationError, ConfigurationError, ConversionError, MapError, MapResult,
    RecursionLimitReached,
};
pub use interner::{InternError, NameInterner, SharedInterner};
pub use key::{MapKind, TransformKey, TypeTuple};
pub use name::Name;
pub use stack::ensure_sufficient_stack;
pub use type_id::TypeId;
pub use value::{MapValue, ObjectRef, SeqValue, Value, ValueIndex};
