//! Scalar conversion: numbers, booleans, chars, strings and enums.
//!
//! Numeric narrowing follows `as` semantics (wrapping for integers,
//! saturating for float → int); there is no range check. Strings parse and
//! format without locale. `Null` becomes `Null` for nullable targets and the
//! type's default otherwise. Every other failure is a `ConversionError`.

use mapr_ir::{MapError, MapResult, TypeId, Value};
use mapr_types::{TypeData, TypePool};

use crate::enums::{enum_from_str, enum_to_enum, enum_to_string};

/// Primitive (other than unit/any) or enum, possibly nullable.
pub fn is_scalar(pool: &TypePool, ty: TypeId) -> bool {
    let ty = pool.strip_nullable(ty);
    (ty.is_primitive() && ty != TypeId::UNIT && ty != TypeId::ANY) || pool.is_enum(ty)
}

/// Whether `convert_scalar` handles `from → to` for non-null values.
pub fn can_convert(pool: &TypePool, from: TypeId, to: TypeId) -> bool {
    let from = pool.strip_nullable(from);
    let to = pool.strip_nullable(to);
    if from == to || to == TypeId::ANY {
        return true;
    }
    if !is_scalar(pool, from) || !is_scalar(pool, to) {
        return false;
    }
    let from_enum = pool.is_enum(from);
    let to_enum = pool.is_enum(to);
    let numeric_like = |t: TypeId| t.is_numeric() || t == TypeId::BOOL;

    match (from, to) {
        (_, TypeId::STR) | (TypeId::STR, _) => true,
        _ if from_enum && to_enum => true,
        _ if from_enum => to.is_integer(),
        _ if to_enum => from.is_integer(),
        (TypeId::CHAR, t) | (t, TypeId::CHAR) => t.is_integer(),
        (a, b) => numeric_like(a) && numeric_like(b),
    }
}

fn fail(pool: &TypePool, value: &Value, to: TypeId, reason: impl Into<String>) -> MapError {
    let from = value
        .runtime_type()
        .map_or_else(|| "null".to_owned(), |t| pool.format_type(t));
    MapError::conversion(from, pool.format_type(to), format!("{value:?}"), reason)
}

/// Convert `value` to scalar type `to`.
pub fn convert_scalar(pool: &TypePool, value: &Value, to: TypeId) -> MapResult<Value> {
    if to == TypeId::ANY {
        return Ok(value.clone());
    }
    if value.is_null() {
        return Ok(if pool.is_nullable(to) {
            Value::Null
        } else {
            pool.default_value(to)
        });
    }
    let target = pool.strip_nullable(to);
    if value.runtime_type() == Some(target) {
        return Ok(value.clone());
    }

    match target {
        TypeId::STR => to_string(pool, value, target),
        TypeId::BOOL => to_bool(pool, value, target),
        TypeId::CHAR => to_char(pool, value, target),
        t if t.is_integer() => to_integer(pool, value, t),
        t if t.is_float() => to_float(pool, value, t),
        t => match pool.data(t) {
            TypeData::Enum(def) => to_enum(pool, value, t, &def),
            _ => Err(fail(pool, value, to, "target is not a scalar type")),
        },
    }
}

fn to_string(pool: &TypePool, value: &Value, to: TypeId) -> MapResult<Value> {
    let text = match value {
        Value::Str(s) => return Ok(Value::Str(s.clone())),
        Value::Bool(b) => b.to_string(),
        Value::F32(n) => n.to_string(),
        Value::F64(n) => n.to_string(),
        Value::Char(c) => c.to_string(),
        Value::U64(n) => n.to_string(),
        Value::Enum { ty, bits } => match pool.enum_def(*ty) {
            Some(def) => enum_to_string(pool, &def, *bits),
            None => bits.to_string(),
        },
        other => match other.as_i64() {
            Some(n) => n.to_string(),
            None => return Err(fail(pool, value, to, "value has no string form")),
        },
    };
    Ok(Value::string(text))
}

fn to_bool(pool: &TypePool, value: &Value, to: TypeId) -> MapResult<Value> {
    match value {
        Value::Str(s) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if s.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(fail(pool, value, to, "expected `true` or `false`"))
            }
        }
        Value::F32(n) => Ok(Value::Bool(*n != 0.0)),
        Value::F64(n) => Ok(Value::Bool(*n != 0.0)),
        Value::Char(_) | Value::Enum { .. } => {
            Err(fail(pool, value, to, "no boolean interpretation"))
        }
        other => other
            .as_i64()
            .map(|n| Value::Bool(n != 0))
            .ok_or_else(|| fail(pool, value, to, "no boolean interpretation")),
    }
}

fn to_char(pool: &TypePool, value: &Value, to: TypeId) -> MapResult<Value> {
    match value {
        Value::Str(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(fail(pool, value, to, "expected exactly one character")),
            }
        }
        Value::Bool(_) | Value::Enum { .. } | Value::F32(_) | Value::F64(_) => {
            Err(fail(pool, value, to, "no character interpretation"))
        }
        other => other
            .as_i64()
            .and_then(|n| u32::try_from(n).ok())
            .and_then(char::from_u32)
            .map(Value::Char)
            .ok_or_else(|| fail(pool, value, to, "not a valid code point")),
    }
}

/// Native `as` cast of an integer payload into integer type `to`.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "narrowing wraps like a native cast"
)]
fn cast_int(n: i128, to: TypeId) -> Value {
    match to {
        TypeId::I8 => Value::I8(n as i8),
        TypeId::I16 => Value::I16(n as i16),
        TypeId::I32 => Value::I32(n as i32),
        TypeId::U8 => Value::U8(n as u8),
        TypeId::U16 => Value::U16(n as u16),
        TypeId::U32 => Value::U32(n as u32),
        TypeId::U64 => Value::U64(n as u64),
        _ => Value::I64(n as i64),
    }
}

/// Saturating float → integer cast.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "float to int saturates like a native cast"
)]
fn cast_float_to_int(n: f64, to: TypeId) -> Value {
    match to {
        TypeId::I8 => Value::I8(n as i8),
        TypeId::I16 => Value::I16(n as i16),
        TypeId::I32 => Value::I32(n as i32),
        TypeId::U8 => Value::U8(n as u8),
        TypeId::U16 => Value::U16(n as u16),
        TypeId::U32 => Value::U32(n as u32),
        TypeId::U64 => Value::U64(n as u64),
        _ => Value::I64(n as i64),
    }
}

fn int_payload(value: &Value) -> Option<i128> {
    match value {
        Value::U64(n) => Some(i128::from(*n)),
        other => other.as_i64().map(i128::from),
    }
}

fn parse_int(text: &str, to: TypeId) -> Option<Value> {
    let text = text.trim();
    Some(match to {
        TypeId::I8 => Value::I8(text.parse().ok()?),
        TypeId::I16 => Value::I16(text.parse().ok()?),
        TypeId::I32 => Value::I32(text.parse().ok()?),
        TypeId::U8 => Value::U8(text.parse().ok()?),
        TypeId::U16 => Value::U16(text.parse().ok()?),
        TypeId::U32 => Value::U32(text.parse().ok()?),
        TypeId::U64 => Value::U64(text.parse().ok()?),
        _ => Value::I64(text.parse().ok()?),
    })
}

fn to_integer(pool: &TypePool, value: &Value, to: TypeId) -> MapResult<Value> {
    match value {
        Value::Str(s) => {
            parse_int(s, to).ok_or_else(|| fail(pool, value, to, "not a valid integer"))
        }
        Value::F32(n) => Ok(cast_float_to_int(f64::from(*n), to)),
        Value::F64(n) => Ok(cast_float_to_int(*n, to)),
        other => int_payload(other)
            .map(|n| cast_int(n, to))
            .ok_or_else(|| fail(pool, value, to, "not a numeric value")),
    }
}

#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    reason = "int to float and f64 to f32 lose precision like a native cast"
)]
fn to_float(pool: &TypePool, value: &Value, to: TypeId) -> MapResult<Value> {
    let n: f64 = match value {
        Value::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| fail(pool, value, to, "not a valid number"))?,
        Value::F32(n) => f64::from(*n),
        Value::F64(n) => *n,
        Value::Char(_) | Value::Enum { .. } => {
            return Err(fail(pool, value, to, "not a numeric value"))
        }
        other => int_payload(other)
            .map(|n| n as f64)
            .ok_or_else(|| fail(pool, value, to, "not a numeric value"))?,
    };
    Ok(if to == TypeId::F32 {
        Value::F32(n as f32)
    } else {
        Value::F64(n)
    })
}

fn to_enum(
    pool: &TypePool,
    value: &Value,
    to: TypeId,
    def: &mapr_types::EnumDef,
) -> MapResult<Value> {
    let bits = match value {
        Value::Str(s) => enum_from_str(pool, to, def, s)?,
        Value::Enum { ty, bits } => match pool.enum_def(*ty) {
            Some(from_def) => enum_to_enum(pool, (*ty, &from_def), (to, def), *bits)?,
            None => *bits,
        },
        Value::Char(_) | Value::Bool(_) | Value::F32(_) | Value::F64(_) => {
            return Err(fail(pool, value, to, "enums convert from integers or names"))
        }
        other => other
            .as_i64()
            .ok_or_else(|| fail(pool, value, to, "not an enum value"))?,
    };
    Ok(Value::enum_value(to, bits))
}
