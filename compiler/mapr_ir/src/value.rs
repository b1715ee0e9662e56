//! Dynamic instances of pool-described types.
//!
//! Records are shared, interior-mutable objects with reference identity, so a
//! graph can contain cycles and one instance can be reachable from several
//! places. Sequences and maps are immutable shared vectors.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;

use crate::TypeId;

/// A runtime value.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    Str(Arc<str>),
    /// Enum member, stored as its underlying value.
    Enum { ty: TypeId, bits: i64 },
    Object(ObjectRef),
    Seq(SeqValue),
    Map(MapValue),
}

impl Value {
    #[inline]
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    #[inline]
    pub fn enum_value(ty: TypeId, bits: i64) -> Self {
        Value::Enum { ty, bits }
    }

    #[inline]
    pub fn seq(ty: TypeId, items: Vec<Value>) -> Self {
        Value::Seq(SeqValue::new(ty, items))
    }

    #[inline]
    pub fn map(ty: TypeId, entries: Vec<(Value, Value)>) -> Self {
        Value::Map(MapValue::new(ty, entries))
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&SeqValue> {
        match self {
            Value::Seq(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Widen any integer, bool or char payload to `i64`.
    ///
    /// `u64` values above `i64::MAX` wrap, matching `as` semantics.
    #[expect(
        clippy::cast_possible_wrap,
        reason = "u64 payloads wrap like a native cast"
    )]
    pub fn as_i64(&self) -> Option<i64> {
        Some(match *self {
            Value::Bool(b) => i64::from(b),
            Value::I8(n) => i64::from(n),
            Value::I16(n) => i64::from(n),
            Value::I32(n) => i64::from(n),
            Value::I64(n) => n,
            Value::U8(n) => i64::from(n),
            Value::U16(n) => i64::from(n),
            Value::U32(n) => i64::from(n),
            Value::U64(n) => n as i64,
            Value::Char(c) => i64::from(u32::from(c)),
            Value::Enum { bits, .. } => bits,
            _ => return None,
        })
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(n) => Some(f64::from(n)),
            Value::F64(n) => Some(n),
            _ => None,
        }
    }

    /// Primitive type of this value, if it is a primitive.
    pub fn primitive_type(&self) -> Option<TypeId> {
        Some(match self {
            Value::Bool(_) => TypeId::BOOL,
            Value::I8(_) => TypeId::I8,
            Value::I16(_) => TypeId::I16,
            Value::I32(_) => TypeId::I32,
            Value::I64(_) => TypeId::I64,
            Value::U8(_) => TypeId::U8,
            Value::U16(_) => TypeId::U16,
            Value::U32(_) => TypeId::U32,
            Value::U64(_) => TypeId::U64,
            Value::F32(_) => TypeId::F32,
            Value::F64(_) => TypeId::F64,
            Value::Char(_) => TypeId::CHAR,
            Value::Str(_) => TypeId::STR,
            _ => return None,
        })
    }

    /// Runtime type of this value. `Null` has no type.
    pub fn runtime_type(&self) -> Option<TypeId> {
        match self {
            Value::Null => None,
            Value::Enum { ty, .. } => Some(*ty),
            Value::Object(obj) => Some(obj.ty()),
            Value::Seq(seq) => Some(seq.ty),
            Value::Map(map) => Some(map.ty),
            other => other.primitive_type(),
        }
    }

    /// Structural equality: objects compare by field contents rather than
    /// identity.
    ///
    /// Does not detect cycles; only call on acyclic graphs.
    pub fn deep_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => {
                if ObjectRef::ptr_eq(a, b) {
                    return true;
                }
                let (fa, fb) = (a.fields(), b.fields());
                a.ty() == b.ty()
                    && fa.len() == fb.len()
                    && fa.iter().zip(fb.iter()).all(|(x, y)| x.deep_eq(y))
            }
            (Value::Seq(a), Value::Seq(b)) => {
                a.ty == b.ty
                    && a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| x.deep_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.ty == b.ty
                    && a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka.deep_eq(kb) && va.deep_eq(vb))
            }
            _ => self == other,
        }
    }
}

/// Shallow equality: objects compare by identity, collections element-wise.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (
                Value::Enum { ty: ta, bits: ba },
                Value::Enum { ty: tb, bits: bb },
            ) => ta == tb && ba == bb,
            (Value::Object(a), Value::Object(b)) => ObjectRef::ptr_eq(a, b),
            (Value::Seq(a), Value::Seq(b)) => a.ty == b.ty && a.items == b.items,
            (Value::Map(a), Value::Map(b)) => a.ty == b.ty && a.entries == b.entries,
            _ => false,
        }
    }
}

// Floats compare by bit pattern, so equality is reflexive.
impl Eq for Value {}

/// Agrees with `PartialEq`: floats hash their bits, objects their identity.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::I8(n) => n.hash(state),
            Value::I16(n) => n.hash(state),
            Value::I32(n) => n.hash(state),
            Value::I64(n) => n.hash(state),
            Value::U8(n) => n.hash(state),
            Value::U16(n) => n.hash(state),
            Value::U32(n) => n.hash(state),
            Value::U64(n) => n.hash(state),
            Value::F32(n) => n.to_bits().hash(state),
            Value::F64(n) => n.to_bits().hash(state),
            Value::Char(c) => c.hash(state),
            Value::Str(s) => s.hash(state),
            Value::Enum { ty, bits } => {
                ty.hash(state);
                bits.hash(state);
            }
            Value::Object(o) => o.identity().hash(state),
            Value::Seq(s) => {
                s.ty.hash(state);
                s.items.hash(state);
            }
            Value::Map(m) => {
                m.ty.hash(state);
                m.entries.hash(state);
            }
        }
    }
}

impl Value {
    /// `Hash` digest under `FxHasher`.
    pub fn hash_code(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Positions of values in some backing slice, bucketed by `hash_code`.
///
/// Keys are not stored; callers resolve a position back to its value, so
/// objects stay out of hash-map keys.
#[derive(Clone, Debug, Default)]
pub struct ValueIndex {
    buckets: FxHashMap<u64, SmallVec<[usize; 1]>>,
}

impl ValueIndex {
    /// Position of a value equal to `key`, resolving candidates with `key_at`.
    pub fn position<'a>(&self, key: &Value, key_at: impl Fn(usize) -> &'a Value) -> Option<usize> {
        self.buckets
            .get(&key.hash_code())?
            .iter()
            .copied()
            .find(|&i| key_at(i) == key)
    }

    pub fn insert(&mut self, key: &Value, position: usize) {
        self.buckets
            .entry(key.hash_code())
            .or_default()
            .push(position);
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::I32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::I64(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::F64(n)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

// ObjectRef

/// Record instance storage.
struct Object {
    ty: TypeId,
    fields: RwLock<Vec<Value>>,
}

/// Shared handle to a record instance.
///
/// Cloning the handle shares the instance. Field writes are visible through
/// every handle, which is what lets a mapped cycle close on itself.
#[derive(Clone)]
pub struct ObjectRef(Arc<Object>);

impl ObjectRef {
    pub fn new(ty: TypeId, fields: Vec<Value>) -> Self {
        ObjectRef(Arc::new(Object {
            ty,
            fields: RwLock::new(fields),
        }))
    }

    #[inline]
    pub fn ty(&self) -> TypeId {
        self.0.ty
    }

    /// Field value by layout index; out-of-range reads yield `Null`.
    pub fn get(&self, index: usize) -> Value {
        self.0
            .fields
            .read()
            .get(index)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Store a field value. Returns `false` if the index is out of range.
    pub fn set(&self, index: usize, value: Value) -> bool {
        let mut fields = self.0.fields.write();
        match fields.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Snapshot of all field values.
    pub fn fields(&self) -> Vec<Value> {
        self.0.fields.read().clone()
    }

    pub fn field_count(&self) -> usize {
        self.0.fields.read().len()
    }

    #[inline]
    pub fn ptr_eq(a: &ObjectRef, b: &ObjectRef) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Address-based identity, stable while any handle is alive.
    #[inline]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for ObjectRef {
    // Fields are not printed: the graph may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({:?}@{:#x})", self.ty(), self.identity())
    }
}

// Collections

/// Sequence instance (array, list, set or immutable list).
#[derive(Clone, Debug)]
pub struct SeqValue {
    pub ty: TypeId,
    items: Arc<Vec<Value>>,
}

impl SeqValue {
    pub fn new(ty: TypeId, items: Vec<Value>) -> Self {
        Self {
            ty,
            items: Arc::new(items),
        }
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }
}

/// Dictionary instance. Entries keep insertion order; `index` maps each key
/// to its first entry.
#[derive(Clone, Debug)]
pub struct MapValue {
    pub ty: TypeId,
    entries: Arc<Vec<(Value, Value)>>,
    index: Arc<ValueIndex>,
}

impl MapValue {
    pub fn new(ty: TypeId, entries: Vec<(Value, Value)>) -> Self {
        let mut index = ValueIndex::default();
        for (i, (key, _)) in entries.iter().enumerate() {
            if index.position(key, |j| &entries[j].0).is_none() {
                index.insert(key, i);
            }
        }
        Self {
            ty,
            entries: Arc::new(entries),
            index: Arc::new(index),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Value, Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        let i = self.index.position(key, |j| &self.entries[j].0)?;
        self.entries.get(i).map(|(_, v)| v)
    }
}
