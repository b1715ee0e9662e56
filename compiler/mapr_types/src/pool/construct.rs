//! Builders for registering records and enums in the pool.

use std::sync::Arc;

use mapr_ir::{MapError, MapResult, Name, ObjectRef, TypeId, Value};

use super::TypePool;
use crate::defs::{
    Access, CtorDef, CtorParam, EnumDef, EnumMember, FieldDef, MethodDef, RecordDef,
};

/// Builder for a record definition.
///
/// The record is declared when the builder is created, so `id()` can be used
/// as a field type before `build()` (self-referential records).
#[must_use]
pub struct RecordBuilder<'p> {
    pool: &'p TypePool,
    id: TypeId,
    name: Name,
    fields: Vec<FieldDef>,
    methods: Vec<MethodDef>,
    ctor_params: Option<Vec<Name>>,
    default_constructible: bool,
}

impl<'p> RecordBuilder<'p> {
    pub(super) fn new(pool: &'p TypePool, name: &str) -> Self {
        let id = pool.declare(name);
        Self {
            pool,
            id,
            name: pool.name(name),
            fields: Vec::new(),
            methods: Vec::new(),
            ctor_params: None,
            default_constructible: true,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    fn push_field(mut self, name: &str, ty: TypeId, writable: bool, access: Access) -> Self {
        self.fields.push(FieldDef {
            name: self.pool.name(name),
            ty,
            readable: true,
            writable,
            access,
        });
        self
    }

    /// Public read/write field.
    pub fn field(self, name: &str, ty: TypeId) -> Self {
        self.push_field(name, ty, true, Access::Public)
    }

    /// Public field settable only through the constructor.
    pub fn readonly_field(self, name: &str, ty: TypeId) -> Self {
        self.push_field(name, ty, false, Access::Public)
    }

    /// Private read/write field.
    pub fn private_field(self, name: &str, ty: TypeId) -> Self {
        self.push_field(name, ty, true, Access::Private)
    }

    /// Zero-argument accessor method.
    pub fn method<F>(mut self, name: &str, ret: TypeId, body: F) -> Self
    where
        F: Fn(&ObjectRef) -> Value + Send + Sync + 'static,
    {
        self.methods.push(MethodDef {
            name: self.pool.name(name),
            ret,
            access: Access::Public,
            body: Arc::new(body),
        });
        self
    }

    /// Parameterized constructor whose parameters initialize the same-named
    /// fields. Removes the parameterless constructor.
    pub fn constructor(mut self, params: &[&str]) -> Self {
        self.ctor_params = Some(params.iter().map(|p| self.pool.name(p)).collect());
        self.default_constructible = false;
        self
    }

    /// Keep or drop the parameterless constructor.
    pub fn default_constructible(mut self, yes: bool) -> Self {
        self.default_constructible = yes;
        self
    }

    pub fn build(self) -> MapResult<TypeId> {
        let ctor = match self.ctor_params {
            Some(names) => {
                let mut params = Vec::with_capacity(names.len());
                for name in names {
                    let field = self
                        .fields
                        .iter()
                        .position(|f| f.name == name)
                        .ok_or_else(|| {
                            MapError::configuration(
                                self.pool.lookup_name(self.name),
                                format!(
                                    "constructor parameter `{}` has no matching field",
                                    self.pool.lookup_name(name)
                                ),
                            )
                        })?;
                    params.push(CtorParam {
                        name,
                        ty: self.fields[field].ty,
                        field,
                    });
                }
                Some(CtorDef { params })
            }
            None => None,
        };

        self.pool.define_record(
            self.id,
            RecordDef {
                name: self.name,
                fields: self.fields,
                methods: self.methods,
                ctor,
                default_constructible: self.default_constructible,
            },
        )?;
        Ok(self.id)
    }
}

/// Builder for an enum definition.
#[must_use]
pub struct EnumBuilder<'p> {
    pool: &'p TypePool,
    id: TypeId,
    name: Name,
    flags: bool,
    members: Vec<EnumMember>,
}

impl<'p> EnumBuilder<'p> {
    pub(super) fn new(pool: &'p TypePool, name: &str) -> Self {
        Self {
            pool,
            id: pool.declare(name),
            name: pool.name(name),
            flags: false,
            members: Vec::new(),
        }
    }

    /// Members combine bitwise.
    pub fn flags(mut self) -> Self {
        self.flags = true;
        self
    }

    pub fn member(mut self, name: &str, value: i64) -> Self {
        self.members.push(EnumMember {
            name: self.pool.name(name),
            value,
        });
        self
    }

    pub fn build(self) -> MapResult<TypeId> {
        self.pool.define_enum(
            self.id,
            EnumDef {
                name: self.name,
                flags: self.flags,
                members: self.members,
            },
        )?;
        Ok(self.id)
    }
}
