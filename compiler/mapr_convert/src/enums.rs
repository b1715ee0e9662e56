//! Enum ↔ string conversion.
//!
//! Flags enums render as the set of member names whose bits cover the value,
//! chosen greedily from the highest member value down so combined members
//! (`All = 7`) win over their parts. Values whose bits do not decompose into
//! named members render as the raw number.

use smallvec::SmallVec;

use mapr_ir::{MapError, MapResult, TypeId};
use mapr_types::{EnumDef, TypePool};

/// Separator between flag names, as produced and accepted.
pub const FLAG_SEPARATOR: &str = ", ";

/// Render `bits` of enum `def`.
pub fn enum_to_string(pool: &TypePool, def: &EnumDef, bits: i64) -> String {
    if let Some(member) = def.member_for(bits) {
        return pool.lookup_name(member.name).to_owned();
    }
    if !def.flags || bits == 0 {
        return bits.to_string();
    }

    let mut members: SmallVec<[_; 16]> = def.members.iter().filter(|m| m.value != 0).collect();
    members.sort_by(|a, b| b.value.cmp(&a.value));

    let mut remaining = bits;
    let mut picked: SmallVec<[_; 8]> = SmallVec::new();
    for member in members {
        if remaining & member.value == member.value {
            picked.push(member);
            remaining &= !member.value;
        }
    }
    if remaining != 0 {
        return bits.to_string();
    }

    picked.reverse();
    picked
        .iter()
        .map(|m| pool.lookup_name(m.name))
        .collect::<Vec<_>>()
        .join(FLAG_SEPARATOR)
}

/// Parse a member name, comma-separated flag names, or a number.
///
/// Names match case-insensitively.
pub fn enum_from_str(pool: &TypePool, ty: TypeId, def: &EnumDef, text: &str) -> MapResult<i64> {
    let text = text.trim();
    if let Ok(n) = text.parse::<i64>() {
        return Ok(n);
    }

    let mut bits = 0i64;
    let mut any = false;
    for part in text.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let member = def.member_named(pool.interner(), part).ok_or_else(|| {
            MapError::conversion(
                "str",
                pool.format_type(ty),
                format!("{text:?}"),
                format!("`{part}` is not a member"),
            )
        })?;
        bits |= member.value;
        any = true;
    }
    if !any {
        return Err(MapError::conversion(
            "str",
            pool.format_type(ty),
            format!("{text:?}"),
            "empty enum name",
        ));
    }
    Ok(bits)
}

/// Convert between two enum types by member name.
pub fn enum_to_enum(
    pool: &TypePool,
    from: (TypeId, &EnumDef),
    to: (TypeId, &EnumDef),
    bits: i64,
) -> MapResult<i64> {
    let rendered = enum_to_string(pool, from.1, bits);
    enum_from_str(pool, to.0, to.1, &rendered).map_err(|_| {
        MapError::conversion(
            pool.format_type(from.0),
            pool.format_type(to.0),
            rendered,
            "no member with a matching name",
        )
    })
}
