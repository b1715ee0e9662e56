//! Type pool and schema introspection for mapr.
//!
//! Rust has no runtime reflection, so mappable types are described to a
//! `TypePool`: records (fields, zero-argument methods, constructors), enums,
//! and interned structural types (nullable, sequences, maps). The
//! `Introspector` turns those definitions into ordered, cached member lists
//! for the planner.

mod defs;
mod introspect;
mod pool;
mod words;

pub use defs::{
    Access, CtorDef, CtorParam, EnumDef, EnumMember, FieldDef, MethodDef, MethodFn, RecordDef,
    SeqKind,
};
pub use introspect::{
    DirectiveMap, Introspector, MemberDescriptor, MemberDirectives, MemberKind, Role,
    TypeDescriptor,
};
pub use pool::{EnumBuilder, RecordBuilder, TypeData, TypePool};
pub use words::{names_match, split_words};
