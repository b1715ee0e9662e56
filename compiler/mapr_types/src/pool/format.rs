//! Type formatting for diagnostics.

#![allow(clippy::format_push_string)]

use mapr_ir::TypeId;

use super::{TypeData, TypePool};
use crate::defs::SeqKind;

impl TypePool {
    /// Format a type as a human-readable string.
    pub fn format_type(&self, ty: TypeId) -> String {
        let mut buf = String::new();
        self.format_type_into(ty, &mut buf);
        buf
    }

    pub fn format_type_into(&self, ty: TypeId, buf: &mut String) {
        if let Some(name) = ty.primitive_name() {
            buf.push_str(name);
            return;
        }
        match self.data(ty) {
            TypeData::Primitive(_) | TypeData::Reserved => buf.push_str("<invalid>"),
            TypeData::Nullable(inner) => {
                self.format_type_into(inner, buf);
                buf.push('?');
            }
            TypeData::Seq { kind, elem } => {
                let (open, close) = match kind {
                    SeqKind::Array => ("[", "]"),
                    SeqKind::List => ("List<", ">"),
                    SeqKind::Set => ("Set<", ">"),
                    SeqKind::ImmutableList => ("ImmutableList<", ">"),
                };
                buf.push_str(open);
                self.format_type_into(elem, buf);
                buf.push_str(close);
            }
            TypeData::Map { key, value } => {
                buf.push_str("Map<");
                self.format_type_into(key, buf);
                buf.push_str(", ");
                self.format_type_into(value, buf);
                buf.push('>');
            }
            TypeData::Record(def) => buf.push_str(self.lookup_name(def.name)),
            TypeData::Enum(def) => buf.push_str(self.lookup_name(def.name)),
            TypeData::Declared(name) => buf.push_str(self.lookup_name(name)),
        }
    }
}
