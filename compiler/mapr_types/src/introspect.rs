//! Type schema introspection.
//!
//! Turns a record definition into the ordered member list a planner works
//! from, for one role:
//!
//! - **Source**: readable fields, then zero-argument methods.
//! - **Destination**: writable fields. Records that must be built through a
//!   constructor contribute their constructor parameters first, and fields
//!   those parameters initialize are not listed again.
//!
//! Destination descriptors carry the directives configured for their pair.
//! Results are cached per `(type, role, configuration revision)`; a new
//! revision yields a fresh entry and `forget` drops stale ones.

use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHashMap;

use mapr_ir::{MapError, MapResult, Name, NameInterner, TypeId};

use crate::defs::Access;
use crate::pool::TypePool;
use crate::words::names_match;

/// Which side of a mapping a type is introspected for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Source,
    Destination,
}

/// How a member is read or written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Record field at a layout index.
    Field(usize),
    /// Zero-argument method at a method index.
    Method(usize),
    /// Constructor parameter `param`, which initializes field `field`.
    CtorParam { param: usize, field: usize },
}

/// Per-member directives attached to destination descriptors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemberDirectives {
    pub ignored: bool,
    /// Source path (dot separated) replacing name matching.
    pub map_from: Option<Arc<str>>,
    /// Plan the conversion into this type instead of the declared one.
    pub type_override: Option<TypeId>,
    /// A guard condition is registered.
    pub conditional: bool,
    /// An explicit resolver is registered.
    pub resolved: bool,
}

/// Directives for one pair, keyed by destination member name.
pub type DirectiveMap = FxHashMap<Name, MemberDirectives>;

/// One member as seen by the planner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberDescriptor {
    pub name: Name,
    /// Effective type, after any override.
    pub ty: TypeId,
    pub declared_ty: TypeId,
    pub kind: MemberKind,
    pub readable: bool,
    pub writable: bool,
    pub access: Access,
    pub directives: MemberDirectives,
}

impl MemberDescriptor {
    pub fn is_ctor_param(&self) -> bool {
        matches!(self.kind, MemberKind::CtorParam { .. })
    }
}

/// Ordered members of a type in one role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub ty: TypeId,
    pub role: Role,
    pub members: Vec<MemberDescriptor>,
    /// Destination is built through its parameterized constructor.
    pub constructs_via_ctor: bool,
}

impl TypeDescriptor {
    pub fn member(&self, name: Name) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }

    /// First member whose name matches `words` ignoring case and `_`.
    pub fn find_words(&self, interner: &NameInterner, words: &[&str]) -> Option<&MemberDescriptor> {
        self.members
            .iter()
            .find(|m| names_match(interner.lookup(m.name), words))
    }
}

type CacheKey = (TypeId, Role, u64);

/// Cached schema introspection.
pub struct Introspector {
    cache: DashMap<CacheKey, Arc<TypeDescriptor>>,
    include_private: bool,
}

impl Introspector {
    pub fn new(include_private: bool) -> Self {
        Self {
            cache: DashMap::new(),
            include_private,
        }
    }

    /// Source-role members of `ty`.
    pub fn source(&self, pool: &TypePool, ty: TypeId) -> Arc<TypeDescriptor> {
        let key = (ty, Role::Source, 0);
        if let Some(hit) = self.cache.get(&key) {
            return Arc::clone(&hit);
        }
        let built = Arc::new(self.build_source(pool, ty));
        Arc::clone(self.cache.entry(key).or_insert(built).value())
    }

    /// Destination-role members of `ty` with `directives` applied.
    ///
    /// `revision` identifies the configuration the directives came from.
    /// Directives naming a member the type does not have are a configuration
    /// error.
    pub fn destination(
        &self,
        pool: &TypePool,
        ty: TypeId,
        directives: &DirectiveMap,
        revision: u64,
    ) -> MapResult<Arc<TypeDescriptor>> {
        let key = (ty, Role::Destination, revision);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(Arc::clone(&hit));
        }
        let built = Arc::new(self.build_destination(pool, ty, directives)?);
        Ok(Arc::clone(self.cache.entry(key).or_insert(built).value()))
    }

    /// Drop cached destination descriptors of `ty`.
    pub fn forget(&self, ty: TypeId) {
        self.cache
            .retain(|&(cached, role, _), _| cached != ty || role == Role::Source);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn visible(&self, access: Access) -> bool {
        self.include_private || access == Access::Public
    }

    fn build_source(&self, pool: &TypePool, ty: TypeId) -> TypeDescriptor {
        let mut members = Vec::new();
        if let Some(def) = pool.record_def(ty) {
            for (index, field) in def.fields.iter().enumerate() {
                if !field.readable || !self.visible(field.access) {
                    continue;
                }
                members.push(MemberDescriptor {
                    name: field.name,
                    ty: field.ty,
                    declared_ty: field.ty,
                    kind: MemberKind::Field(index),
                    readable: true,
                    writable: field.writable,
                    access: field.access,
                    directives: MemberDirectives::default(),
                });
            }
            for (index, method) in def.methods.iter().enumerate() {
                if !self.visible(method.access) {
                    continue;
                }
                members.push(MemberDescriptor {
                    name: method.name,
                    ty: method.ret,
                    declared_ty: method.ret,
                    kind: MemberKind::Method(index),
                    readable: true,
                    writable: false,
                    access: method.access,
                    directives: MemberDirectives::default(),
                });
            }
        }
        tracing::trace!(ty = %pool.format_type(ty), members = members.len(), "introspected source");
        TypeDescriptor {
            ty,
            role: Role::Source,
            members,
            constructs_via_ctor: false,
        }
    }

    fn build_destination(
        &self,
        pool: &TypePool,
        ty: TypeId,
        directives: &DirectiveMap,
    ) -> MapResult<TypeDescriptor> {
        let Some(def) = pool.record_def(ty) else {
            return Ok(TypeDescriptor {
                ty,
                role: Role::Destination,
                members: Vec::new(),
                constructs_via_ctor: false,
            });
        };

        let via_ctor = def.requires_ctor();
        let mut members = Vec::new();
        let mut ctor_fields = Vec::new();

        if via_ctor {
            if let Some(ctor) = &def.ctor {
                for (param, p) in ctor.params.iter().enumerate() {
                    ctor_fields.push(p.field);
                    members.push(MemberDescriptor {
                        name: p.name,
                        ty: p.ty,
                        declared_ty: p.ty,
                        kind: MemberKind::CtorParam {
                            param,
                            field: p.field,
                        },
                        readable: false,
                        writable: true,
                        access: Access::Public,
                        directives: MemberDirectives::default(),
                    });
                }
            }
        }

        for (index, field) in def.fields.iter().enumerate() {
            if !field.writable || !self.visible(field.access) || ctor_fields.contains(&index) {
                continue;
            }
            members.push(MemberDescriptor {
                name: field.name,
                ty: field.ty,
                declared_ty: field.ty,
                kind: MemberKind::Field(index),
                readable: field.readable,
                writable: true,
                access: field.access,
                directives: MemberDirectives::default(),
            });
        }

        for (&name, directive) in directives {
            let Some(member) = members.iter_mut().find(|m| m.name == name) else {
                return Err(MapError::member_configuration(
                    pool.format_type(ty),
                    pool.lookup_name(name),
                    "no writable destination member with this name",
                ));
            };
            if let Some(over) = directive.type_override {
                member.ty = over;
            }
            member.directives = directive.clone();
        }

        Ok(TypeDescriptor {
            ty,
            role: Role::Destination,
            members,
            constructs_via_ctor: via_ctor,
        })
    }
}
