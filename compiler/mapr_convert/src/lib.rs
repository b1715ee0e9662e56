//! Primitive and enum conversion for mapr.
//!
//! Stateless functions over `Value` and a `TypePool`; the planner decides at
//! compile time whether a pair is convertible (`can_convert`), the executor
//! calls `convert_scalar` per value.

mod enums;
mod primitive;

pub use enums::{enum_from_str, enum_to_enum, enum_to_string, FLAG_SEPARATOR};
pub use primitive::{can_convert, convert_scalar, is_scalar};
