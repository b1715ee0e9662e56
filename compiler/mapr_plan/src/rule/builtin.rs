//! Built-in mapping rules.

use mapr_convert::{can_convert, is_scalar};
use mapr_ir::{MapError, MapKind, MapResult, TypeId, TypeTuple};
use mapr_types::{TypeData, TypePool};

use super::{MappingRule, RuleContext};
use crate::converter::Converter;

fn not_applicable(cx: &RuleContext<'_>, tuple: TypeTuple) -> MapError {
    MapError::configuration(cx.pool.pair(tuple), "rule emitted for a pair it does not handle")
}

/// Whether values of `ty` can contain record instances.
fn contains_record(pool: &TypePool, ty: TypeId) -> bool {
    match pool.data(ty) {
        TypeData::Record(_) | TypeData::Declared(_) => true,
        TypeData::Nullable(inner) => contains_record(pool, inner),
        TypeData::Seq { elem, .. } => contains_record(pool, elem),
        TypeData::Map { key, value } => contains_record(pool, key) || contains_record(pool, value),
        _ => false,
    }
}

/// Same type or `ANY` destination: pass through.
///
/// Types holding records are only passed through when same-type mappings
/// are not required to build a new instance.
pub struct IdentityRule;

impl MappingRule for IdentityRule {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn priority(&self) -> u8 {
        100
    }

    fn can_handle(&self, cx: &RuleContext<'_>, tuple: TypeTuple, _kind: MapKind) -> bool {
        if tuple.dest == TypeId::ANY {
            return true;
        }
        tuple.is_same_type()
            && (!cx.config.new_instance_for_same_type || !contains_record(cx.pool, tuple.dest))
    }

    fn emit(&self, _cx: &RuleContext<'_>, _tuple: TypeTuple, _kind: MapKind) -> MapResult<Converter> {
        Ok(Converter::Identity)
    }
}

/// `T? → U?`, `T? → U`, `T → U?`.
pub struct NullableRule;

impl NullableRule {
    fn parts(pool: &TypePool, tuple: TypeTuple) -> Option<(TypeId, TypeId, bool)> {
        let from = pool.strip_nullable(tuple.source);
        let to = pool.strip_nullable(tuple.dest);
        if from == tuple.source && to == tuple.dest {
            return None;
        }
        Some((from, to, to != tuple.dest))
    }
}

impl MappingRule for NullableRule {
    fn name(&self) -> &'static str {
        "nullable"
    }

    fn priority(&self) -> u8 {
        110
    }

    fn can_handle(&self, cx: &RuleContext<'_>, tuple: TypeTuple, kind: MapKind) -> bool {
        Self::parts(cx.pool, tuple).is_some_and(|(from, to, _)| cx.can_convert(from, to, kind))
    }

    fn emit(&self, cx: &RuleContext<'_>, tuple: TypeTuple, kind: MapKind) -> MapResult<Converter> {
        let Some((from, to, wrap)) = Self::parts(cx.pool, tuple) else {
            return Err(not_applicable(cx, tuple));
        };
        let inner = cx.converter(from, to, kind)?;
        Ok(if wrap {
            Converter::Nullable(Box::new(inner))
        } else {
            inner
        })
    }
}

/// Enum to or from enum, integer or string.
pub struct EnumRule;

impl MappingRule for EnumRule {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn priority(&self) -> u8 {
        120
    }

    fn can_handle(&self, cx: &RuleContext<'_>, tuple: TypeTuple, _kind: MapKind) -> bool {
        (cx.pool.is_enum(tuple.source) || cx.pool.is_enum(tuple.dest))
            && can_convert(cx.pool, tuple.source, tuple.dest)
    }

    fn emit(&self, _cx: &RuleContext<'_>, tuple: TypeTuple, _kind: MapKind) -> MapResult<Converter> {
        Ok(Converter::Enum(tuple.dest))
    }
}

/// Numbers, booleans, chars and strings.
pub struct PrimitiveRule;

impl MappingRule for PrimitiveRule {
    fn name(&self) -> &'static str {
        "primitive"
    }

    fn priority(&self) -> u8 {
        130
    }

    fn can_handle(&self, cx: &RuleContext<'_>, tuple: TypeTuple, _kind: MapKind) -> bool {
        is_scalar(cx.pool, tuple.source)
            && is_scalar(cx.pool, tuple.dest)
            && can_convert(cx.pool, tuple.source, tuple.dest)
    }

    fn emit(&self, _cx: &RuleContext<'_>, tuple: TypeTuple, _kind: MapKind) -> MapResult<Converter> {
        Ok(Converter::Primitive(tuple.dest))
    }
}

/// Any sequence shape into any sequence shape, element by element.
pub struct SequenceRule;

impl MappingRule for SequenceRule {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn priority(&self) -> u8 {
        140
    }

    fn can_handle(&self, cx: &RuleContext<'_>, tuple: TypeTuple, kind: MapKind) -> bool {
        match (cx.pool.seq_elem(tuple.source), cx.pool.seq_elem(tuple.dest)) {
            (Some((_, from)), Some((_, to))) => cx.can_convert(from, to, kind),
            _ => false,
        }
    }

    fn emit(&self, cx: &RuleContext<'_>, tuple: TypeTuple, kind: MapKind) -> MapResult<Converter> {
        let (Some((_, from)), Some((dest_kind, to))) =
            (cx.pool.seq_elem(tuple.source), cx.pool.seq_elem(tuple.dest))
        else {
            return Err(not_applicable(cx, tuple));
        };
        Ok(Converter::Seq {
            kind: dest_kind,
            dest: tuple.dest,
            elem_ty: to,
            elem: Box::new(cx.converter(from, to, kind)?),
        })
    }
}

/// Dictionary to dictionary, keys and values converted independently.
pub struct DictionaryRule;

impl DictionaryRule {
    fn entries(pool: &TypePool, ty: TypeId) -> Option<(TypeId, TypeId)> {
        match pool.data(ty) {
            TypeData::Map { key, value } => Some((key, value)),
            _ => None,
        }
    }
}

impl MappingRule for DictionaryRule {
    fn name(&self) -> &'static str {
        "dictionary"
    }

    fn priority(&self) -> u8 {
        150
    }

    fn can_handle(&self, cx: &RuleContext<'_>, tuple: TypeTuple, kind: MapKind) -> bool {
        match (Self::entries(cx.pool, tuple.source), Self::entries(cx.pool, tuple.dest)) {
            (Some((fk, fv)), Some((tk, tv))) => {
                cx.can_convert(fk, tk, kind) && cx.can_convert(fv, tv, kind)
            }
            _ => false,
        }
    }

    fn emit(&self, cx: &RuleContext<'_>, tuple: TypeTuple, kind: MapKind) -> MapResult<Converter> {
        let (Some((fk, fv)), Some((tk, tv))) =
            (Self::entries(cx.pool, tuple.source), Self::entries(cx.pool, tuple.dest))
        else {
            return Err(not_applicable(cx, tuple));
        };
        Ok(Converter::Map {
            dest: tuple.dest,
            key_ty: tk,
            key: Box::new(cx.converter(fk, tk, kind)?),
            value_ty: tv,
            value: Box::new(cx.converter(fv, tv, kind)?),
        })
    }
}

/// Record to record through the compiled plan for the pair.
pub struct RecordRule;

impl MappingRule for RecordRule {
    fn name(&self) -> &'static str {
        "record"
    }

    fn priority(&self) -> u8 {
        160
    }

    fn can_handle(&self, cx: &RuleContext<'_>, tuple: TypeTuple, _kind: MapKind) -> bool {
        cx.pool.is_record(tuple.source) && cx.pool.is_record(tuple.dest)
    }

    fn emit(&self, _cx: &RuleContext<'_>, tuple: TypeTuple, _kind: MapKind) -> MapResult<Converter> {
        Ok(Converter::Nested(tuple))
    }
}
