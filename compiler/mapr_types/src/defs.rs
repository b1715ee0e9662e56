//! Definitions of registered types: records, enums and their members.

use std::fmt;
use std::sync::Arc;

use mapr_ir::{Name, NameInterner, ObjectRef, TypeId, Value};

/// Visibility of a field or method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Access {
    #[default]
    Public,
    Private,
}

/// Shape of a sequence type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeqKind {
    Array,
    List,
    /// Unordered; duplicates collapse, last write wins.
    Set,
    ImmutableList,
}

/// A record field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: Name,
    pub ty: TypeId,
    pub readable: bool,
    pub writable: bool,
    pub access: Access,
}

/// Body of a zero-argument accessor method.
pub type MethodFn = Arc<dyn Fn(&ObjectRef) -> Value + Send + Sync>;

/// A zero-argument accessor method, e.g. `GetTotal()`.
#[derive(Clone)]
pub struct MethodDef {
    pub name: Name,
    pub ret: TypeId,
    pub access: Access,
    pub body: MethodFn,
}

impl MethodDef {
    pub fn call(&self, receiver: &ObjectRef) -> Value {
        (self.body)(receiver)
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("ret", &self.ret)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

/// Constructor parameter; initializes the field at `field`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CtorParam {
    pub name: Name,
    pub ty: TypeId,
    pub field: usize,
}

/// Parameterized constructor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CtorDef {
    pub params: Vec<CtorParam>,
}

/// A record (class/struct) definition.
#[derive(Clone, Debug)]
pub struct RecordDef {
    pub name: Name,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
    pub ctor: Option<CtorDef>,
    /// Has a parameterless constructor.
    pub default_constructible: bool,
}

impl RecordDef {
    pub fn field_index(&self, name: Name) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: Name) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: Name) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Must be built through its constructor.
    pub fn requires_ctor(&self) -> bool {
        !self.default_constructible && self.ctor.is_some()
    }
}

/// A named enum member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumMember {
    pub name: Name,
    pub value: i64,
}

/// An enum definition. `flags` enums combine members bitwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDef {
    pub name: Name,
    pub flags: bool,
    pub members: Vec<EnumMember>,
}

impl EnumDef {
    /// Member whose value is exactly `value`.
    pub fn member_for(&self, value: i64) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.value == value)
    }

    /// Member named `name`, ignoring ASCII case.
    pub fn member_named(&self, interner: &NameInterner, name: &str) -> Option<&EnumMember> {
        self.members
            .iter()
            .find(|m| interner.lookup(m.name).eq_ignore_ascii_case(name))
    }

    /// First member value, or zero for an empty enum.
    pub fn default_value(&self) -> i64 {
        if self.member_for(0).is_some() || self.flags {
            return 0;
        }
        self.members.first().map_or(0, |m| m.value)
    }
}
