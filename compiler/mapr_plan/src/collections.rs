//! Collection construction shared by the executor and the projection
//! evaluator.
//!
//! Sets and dictionaries keep the position of the first occurrence of a
//! duplicate and the value of the last one.

use mapr_ir::{TypeId, Value, ValueIndex};
use mapr_types::{SeqKind, TypeData, TypePool};

/// Build a sequence of type `ty`.
pub fn collect_seq(kind: SeqKind, ty: TypeId, items: impl IntoIterator<Item = Value>) -> Value {
    if kind != SeqKind::Set {
        return Value::seq(ty, items.into_iter().collect());
    }
    let mut out: Vec<Value> = Vec::new();
    let mut slots = ValueIndex::default();
    for item in items {
        if let Some(i) = slots.position(&item, |j| &out[j]) {
            out[i] = item;
        } else {
            slots.insert(&item, out.len());
            out.push(item);
        }
    }
    Value::seq(ty, out)
}

/// Build a dictionary of type `ty`.
pub fn collect_map(ty: TypeId, entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
    let mut out: Vec<(Value, Value)> = Vec::new();
    let mut slots = ValueIndex::default();
    for (key, value) in entries {
        if let Some(i) = slots.position(&key, |j| &out[j].0) {
            out[i].1 = value;
        } else {
            slots.insert(&key, out.len());
            out.push((key, value));
        }
    }
    Value::map(ty, out)
}

/// Empty instance of a collection type; `Null` for anything else.
pub fn empty_collection(pool: &TypePool, ty: TypeId) -> Value {
    let ty = pool.strip_nullable(ty);
    match pool.data(ty) {
        TypeData::Seq { .. } => Value::seq(ty, Vec::new()),
        TypeData::Map { .. } => Value::map(ty, Vec::new()),
        _ => Value::Null,
    }
}
