//! Struct metadata: aggregates with named stored fields.
//!
//! Record layout:
//!
//! | Offset | Content |
//! |--------|---------|
//! | `0` | kind word (1) |
//! | `1*W` | word-sized rel → nominal descriptor |
//! | `2*W` | parent metadata (nullable) |
//! | `3*W ..` | field offset vector, one word per field |
//!
//! Names, count and the field type accessor live in the descriptor; the
//! offsets live in the record itself.

use crate::nominal::{self, NominalDescriptor};
use crate::type_ref::TaggedRef;
use crate::units::words;
use crate::{Metadata, TypeRef};

/// Record offset of the first field offset.
const FIELD_OFFSETS: usize = words(3);

/// One stored field of a struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: Metadata,
    /// Byte offset of the field within a value.
    pub offset: usize,
}

/// View over a struct metadata record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructMetadata {
    ty: TypeRef,
}

impl StructMetadata {
    #[inline]
    pub(crate) const fn new(ty: TypeRef) -> Self {
        StructMetadata { ty }
    }

    #[inline]
    pub fn type_ref(self) -> TypeRef {
        self.ty
    }

    #[inline]
    pub fn descriptor(self) -> NominalDescriptor {
        NominalDescriptor::of(self.ty)
    }

    #[inline]
    pub fn field_count(self) -> usize {
        self.descriptor().primary_count() as usize
    }

    /// Field names in declaration order.
    pub fn field_names(self) -> Vec<String> {
        self.descriptor().names(self.field_count())
    }

    /// Byte offset of each field, in declaration order.
    pub fn field_offsets(self) -> Vec<usize> {
        let raw = self.ty.raw();
        (0..self.field_count())
            .map(|i| raw.read_word(FIELD_OFFSETS + words(i)))
            .collect()
    }

    /// Field types in declaration order.
    ///
    /// `None` when the descriptor has no field type accessor.
    pub fn field_types(self) -> Option<Vec<Metadata>> {
        let types = self.descriptor().type_vector(self.field_count())?;
        Some(types.into_iter().map(TaggedRef::decode).collect())
    }

    /// Word offset of the field offset vector, as recorded in the descriptor.
    #[inline]
    pub fn field_offset_vector_offset(self) -> u32 {
        self.descriptor().secondary_count()
    }

    /// Check if the struct has generic parameters.
    #[inline]
    pub fn is_generic(self) -> bool {
        self.descriptor().generic_param_count() != 0
    }

    /// The enclosing type, for nested structs.
    pub fn parent(self) -> Option<Metadata> {
        nominal::parent(self.ty)
    }

    /// Position of the field called `name`.
    pub fn field_index(self, name: &str) -> Option<usize> {
        self.field_names().iter().position(|n| n == name)
    }

    /// Names, types and offsets zipped per field.
    ///
    /// `None` when field types are unavailable.
    pub fn fields(self) -> Option<Vec<Field>> {
        let types = self.field_types()?;
        Some(
            self.field_names()
                .into_iter()
                .zip(types)
                .zip(self.field_offsets())
                .map(|((name, ty), offset)| Field { name, ty, offset })
                .collect(),
        )
    }
}
