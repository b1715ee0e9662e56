//! The type pool: every type a mapping can mention.
//!
//! # Design
//!
//! - Primitives live at fixed `TypeId`s (see `mapr_ir::TypeId`).
//! - Structural types (`Nullable`, sequences, maps) are interned: asking for
//!   `List<Order>` twice yields the same id.
//! - Nominal types (records, enums) are declared first and defined later, so
//!   a record can refer to itself or to a record declared after it.
//!
//! Entries are stored behind `Arc`, and lookups hold the table lock only long
//! enough to clone the handle.

mod construct;
mod format;

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use mapr_ir::{MapError, MapResult, Name, ObjectRef, SharedInterner, TypeId, Value};

use crate::defs::{EnumDef, RecordDef, SeqKind};

pub use construct::{EnumBuilder, RecordBuilder};

/// What a `TypeId` refers to.
#[derive(Clone, Debug)]
pub enum TypeData {
    Primitive(TypeId),
    /// Slot in the reserved range; never handed out.
    Reserved,
    Nullable(TypeId),
    Seq { kind: SeqKind, elem: TypeId },
    Map { key: TypeId, value: TypeId },
    Record(Arc<RecordDef>),
    Enum(Arc<EnumDef>),
    /// Declared by name, definition pending.
    Declared(Name),
}

/// Interning key for structural types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum StructuralKey {
    Nullable(TypeId),
    Seq(SeqKind, TypeId),
    Map(TypeId, TypeId),
}

/// Registry of type definitions.
pub struct TypePool {
    interner: SharedInterner,
    types: RwLock<Vec<TypeData>>,
    structural: DashMap<StructuralKey, TypeId>,
    by_name: DashMap<Name, TypeId>,
}

impl TypePool {
    pub fn new(interner: SharedInterner) -> Self {
        let mut types = Vec::with_capacity(128);
        for raw in 0..TypeId::FIRST_DYNAMIC {
            let id = TypeId::from_raw(raw);
            types.push(if id.is_primitive() {
                TypeData::Primitive(id)
            } else {
                TypeData::Reserved
            });
        }
        Self {
            interner,
            types: RwLock::new(types),
            structural: DashMap::new(),
            by_name: DashMap::new(),
        }
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// Intern `s` in the pool's interner.
    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub fn lookup_name(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    /// Definition behind `ty`. Unknown ids read as `Reserved`.
    pub fn data(&self, ty: TypeId) -> TypeData {
        self.types
            .read()
            .get(ty.raw() as usize)
            .cloned()
            .unwrap_or(TypeData::Reserved)
    }

    /// Registered nominal type by name.
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        let name = self.interner.get(name)?;
        self.by_name.get(&name).map(|entry| *entry)
    }

    fn push(&self, data: TypeData) -> TypeId {
        let mut types = self.types.write();
        #[expect(
            clippy::cast_possible_truncation,
            reason = "pools never approach u32::MAX types"
        )]
        let id = TypeId::from_raw(types.len() as u32);
        types.push(data);
        id
    }

    fn intern_structural(&self, key: StructuralKey, data: TypeData) -> TypeId {
        if let Some(id) = self.structural.get(&key) {
            return *id;
        }
        *self
            .structural
            .entry(key)
            .or_insert_with(|| self.push(data))
    }

    // === Structural types ===

    /// `inner?`. Types that already admit `Null` are returned unchanged.
    pub fn nullable(&self, inner: TypeId) -> TypeId {
        if self.is_nullable(inner) {
            return inner;
        }
        self.intern_structural(StructuralKey::Nullable(inner), TypeData::Nullable(inner))
    }

    pub fn seq(&self, kind: SeqKind, elem: TypeId) -> TypeId {
        self.intern_structural(StructuralKey::Seq(kind, elem), TypeData::Seq { kind, elem })
    }

    pub fn list(&self, elem: TypeId) -> TypeId {
        self.seq(SeqKind::List, elem)
    }

    pub fn array(&self, elem: TypeId) -> TypeId {
        self.seq(SeqKind::Array, elem)
    }

    pub fn set(&self, elem: TypeId) -> TypeId {
        self.seq(SeqKind::Set, elem)
    }

    pub fn immutable_list(&self, elem: TypeId) -> TypeId {
        self.seq(SeqKind::ImmutableList, elem)
    }

    pub fn map(&self, key: TypeId, value: TypeId) -> TypeId {
        self.intern_structural(StructuralKey::Map(key, value), TypeData::Map { key, value })
    }

    // === Nominal types ===

    /// Declare a nominal type by name. Declaring an existing name returns
    /// its id.
    pub fn declare(&self, name: &str) -> TypeId {
        let name = self.interner.intern(name);
        if let Some(id) = self.by_name.get(&name) {
            return *id;
        }
        *self
            .by_name
            .entry(name)
            .or_insert_with(|| self.push(TypeData::Declared(name)))
    }

    fn define(&self, ty: TypeId, data: TypeData) -> MapResult<()> {
        let mut types = self.types.write();
        match types.get_mut(ty.raw() as usize) {
            Some(slot) if matches!(slot, TypeData::Declared(_)) => {
                *slot = data;
                Ok(())
            }
            Some(_) => Err(MapError::configuration(
                format!("{ty:?}"),
                "type is already defined",
            )),
            None => Err(MapError::configuration(format!("{ty:?}"), "type was never declared")),
        }
    }

    pub fn define_record(&self, ty: TypeId, def: RecordDef) -> MapResult<()> {
        tracing::trace!(record = self.lookup_name(def.name), fields = def.fields.len(), "define record");
        self.define(ty, TypeData::Record(Arc::new(def)))
    }

    pub fn define_enum(&self, ty: TypeId, def: EnumDef) -> MapResult<()> {
        self.define(ty, TypeData::Enum(Arc::new(def)))
    }

    /// Start building a record named `name`.
    pub fn record(&self, name: &str) -> RecordBuilder<'_> {
        RecordBuilder::new(self, name)
    }

    /// Start building an enum named `name`.
    pub fn enumeration(&self, name: &str) -> EnumBuilder<'_> {
        EnumBuilder::new(self, name)
    }

    // === Queries ===

    pub fn record_def(&self, ty: TypeId) -> Option<Arc<RecordDef>> {
        match self.data(ty) {
            TypeData::Record(def) => Some(def),
            _ => None,
        }
    }

    pub fn enum_def(&self, ty: TypeId) -> Option<Arc<EnumDef>> {
        match self.data(ty) {
            TypeData::Enum(def) => Some(def),
            _ => None,
        }
    }

    /// Layout index of field `name` on record `ty`.
    pub fn field_index(&self, ty: TypeId, name: &str) -> Option<usize> {
        let name = self.interner.get(name)?;
        self.record_def(ty)?.field_index(name)
    }

    pub fn is_record(&self, ty: TypeId) -> bool {
        matches!(self.data(ty), TypeData::Record(_))
    }

    pub fn is_enum(&self, ty: TypeId) -> bool {
        matches!(self.data(ty), TypeData::Enum(_))
    }

    /// Sequence or map.
    pub fn is_collection(&self, ty: TypeId) -> bool {
        matches!(self.data(ty), TypeData::Seq { .. } | TypeData::Map { .. })
    }

    /// Element type of a sequence.
    pub fn seq_elem(&self, ty: TypeId) -> Option<(SeqKind, TypeId)> {
        match self.data(ty) {
            TypeData::Seq { kind, elem } => Some((kind, elem)),
            _ => None,
        }
    }

    /// Inner type of `T?`, or `ty` itself.
    pub fn strip_nullable(&self, ty: TypeId) -> TypeId {
        match self.data(ty) {
            TypeData::Nullable(inner) => inner,
            _ => ty,
        }
    }

    /// Whether `Null` is a valid value of `ty`.
    pub fn is_nullable(&self, ty: TypeId) -> bool {
        if ty == TypeId::STR || ty == TypeId::ANY {
            return true;
        }
        matches!(
            self.data(ty),
            TypeData::Nullable(_)
                | TypeData::Record(_)
                | TypeData::Seq { .. }
                | TypeData::Map { .. }
                | TypeData::Declared(_)
        )
    }

    /// Default value of `ty`: zero for numbers, `Null` for nullable types.
    pub fn default_value(&self, ty: TypeId) -> Value {
        match ty {
            TypeId::BOOL => Value::Bool(false),
            TypeId::I8 => Value::I8(0),
            TypeId::I16 => Value::I16(0),
            TypeId::I32 => Value::I32(0),
            TypeId::I64 => Value::I64(0),
            TypeId::U8 => Value::U8(0),
            TypeId::U16 => Value::U16(0),
            TypeId::U32 => Value::U32(0),
            TypeId::U64 => Value::U64(0),
            TypeId::F32 => Value::F32(0.0),
            TypeId::F64 => Value::F64(0.0),
            TypeId::CHAR => Value::Char('\0'),
            _ => match self.data(ty) {
                TypeData::Enum(def) => Value::enum_value(ty, def.default_value()),
                _ => Value::Null,
            },
        }
    }

    /// Allocate a record instance with every field at its default.
    pub fn new_object(&self, ty: TypeId) -> MapResult<ObjectRef> {
        let def = self.record_def(ty).ok_or_else(|| {
            MapError::configuration(self.format_type(ty), "not a defined record type")
        })?;
        let fields = def.fields.iter().map(|f| self.default_value(f.ty)).collect();
        Ok(ObjectRef::new(ty, fields))
    }

    /// Render a type pair for diagnostics, e.g. `Order -> OrderDto`.
    pub fn pair(&self, tuple: mapr_ir::TypeTuple) -> String {
        format!("{} -> {}", self.format_type(tuple.source), self.format_type(tuple.dest))
    }
}
