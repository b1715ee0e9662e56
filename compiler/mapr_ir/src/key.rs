//! Cache keys: type tuples and map kinds.

use std::fmt;

use crate::TypeId;

/// (source type, destination type) pair identifying one mapping
/// configuration scope.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TypeTuple {
    pub source: TypeId,
    pub dest: TypeId,
}

impl TypeTuple {
    #[inline]
    pub const fn new(source: TypeId, dest: TypeId) -> Self {
        Self { source, dest }
    }

    /// Source and destination are the same type.
    #[inline]
    pub fn is_same_type(self) -> bool {
        self.source == self.dest
    }
}

/// What a compiled transform does with its destination.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum MapKind {
    /// Construct a fresh destination instance.
    ConstructNew,
    /// Populate a caller-supplied destination instance.
    MapToExisting,
    /// Emit a pure expression instead of an executable transform.
    Projection,
}

impl fmt::Display for MapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MapKind::ConstructNew => "construct-new",
            MapKind::MapToExisting => "map-to-existing",
            MapKind::Projection => "projection",
        })
    }
}

/// Key of the compiled-transform cache.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TransformKey {
    pub tuple: TypeTuple,
    pub kind: MapKind,
}

impl TransformKey {
    #[inline]
    pub const fn new(tuple: TypeTuple, kind: MapKind) -> Self {
        Self { tuple, kind }
    }
}
