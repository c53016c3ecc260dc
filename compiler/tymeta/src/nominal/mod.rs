//! Nominal type descriptors.
//!
//! Struct and enum records do not carry their names and counts inline.
//! The word after the kind is a word-sized relative offset to a nominal
//! descriptor, a block of packed 32-bit fields:
//!
//! | Offset | Struct | Enum |
//! |--------|--------|------|
//! | `0*H` | rel → mangled name | rel → mangled name |
//! | `1*H` | field count | payload cases (low 12 bits), size class (high bits) |
//! | `2*H` | field offset vector offset (words) | no-payload case count |
//! | `3*H` | rel → field name table | rel → case name table |
//! | `4*H` | rel → field type accessor | rel → case type accessor |
//! | `5*H` | rel → generic metadata pattern | rel → generic metadata pattern |
//! | `6*H` | generic argument vector offset | generic argument vector offset |
//! | `7*H` | generic parameter count | generic parameter count |
//!
//! Each 32-bit relative offset is measured from its own field, so the name
//! table offset is based at `3*H` and the accessor offset at `4*H`. The
//! descriptor offset itself is word-sized and based at the record's second
//! word.

use crate::raw::{read_name_table, RawPtr, TypeVectorAccessor};
use crate::type_ref::TaggedRef;
use crate::units::{half_words, words};
use crate::{Metadata, TypeRef};

/// Record offset of the word-sized relative offset to the descriptor.
pub(crate) const DESCRIPTOR_SLOT: usize = words(1);
/// Record offset of the parent metadata pointer.
pub(crate) const PARENT_SLOT: usize = words(2);

const NAME: usize = half_words(0);
const PRIMARY_COUNT: usize = half_words(1);
const SECONDARY_COUNT: usize = half_words(2);
const NAME_TABLE: usize = half_words(3);
const TYPE_ACCESSOR: usize = half_words(4);
const GENERIC_PATTERN: usize = half_words(5);
const GENERIC_ARGUMENTS_OFFSET: usize = half_words(6);
const GENERIC_PARAM_COUNT: usize = half_words(7);

/// Size of a nominal descriptor.
#[cfg(test)]
pub(crate) const DESCRIPTOR_SIZE: usize = half_words(8);

/// View over the nominal descriptor of a struct or enum.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NominalDescriptor {
    ptr: RawPtr,
}

impl NominalDescriptor {
    /// The descriptor referenced by a struct or enum record.
    #[inline]
    pub(crate) fn of(ty: TypeRef) -> Self {
        NominalDescriptor {
            ptr: ty.raw().resolve_far(DESCRIPTOR_SLOT),
        }
    }

    /// Address of the descriptor.
    #[inline]
    pub fn as_ptr(self) -> *const () {
        self.ptr.as_ptr().cast::<()>()
    }

    /// Mangled type name, if the descriptor records one.
    pub fn mangled_name(self) -> Option<String> {
        if self.ptr.read_i32(NAME) == 0 {
            return None;
        }
        self.ptr.resolve_near(NAME).read_c_str()
    }

    /// Field count (structs) or packed payload case word (enums).
    #[inline]
    pub(crate) fn primary_count(self) -> u32 {
        self.ptr.read_u32(PRIMARY_COUNT)
    }

    /// Field offset vector offset (structs) or no-payload case count (enums).
    #[inline]
    pub(crate) fn secondary_count(self) -> u32 {
        self.ptr.read_u32(SECONDARY_COUNT)
    }

    /// Up to `count` names from the descriptor's name table.
    pub(crate) fn names(self, count: usize) -> Vec<String> {
        if self.ptr.read_i32(NAME_TABLE) == 0 {
            return Vec::new();
        }
        read_name_table(self.ptr.resolve_near(NAME_TABLE), count)
    }

    /// Check if the descriptor references a type accessor.
    #[inline]
    pub fn has_type_accessor(self) -> bool {
        TypeVectorAccessor::resolve(self.ptr.forward(TYPE_ACCESSOR)).is_some()
    }

    /// Call the type accessor and read `count` tagged type references.
    ///
    /// Returns `None` when the accessor is absent, which is how partially
    /// built metadata reports fields of unknown type.
    pub(crate) fn type_vector(self, count: usize) -> Option<Vec<TaggedRef>> {
        let vector = self.call_type_accessor()?;
        Some((0..count).map(|i| TaggedRef::read(vector, words(i))).collect())
    }

    /// Call the type accessor and read the tagged reference at `index`.
    ///
    /// The caller checks `index` against the relevant count.
    pub(crate) fn type_at(self, index: usize) -> Option<TaggedRef> {
        let vector = self.call_type_accessor()?;
        Some(TaggedRef::read(vector, words(index)))
    }

    fn call_type_accessor(self) -> Option<RawPtr> {
        let Some(accessor) = TypeVectorAccessor::resolve(self.ptr.forward(TYPE_ACCESSOR)) else {
            tracing::debug!(descriptor = ?self.ptr, "type accessor absent");
            return None;
        };
        Some(accessor.call(self.ptr))
    }

    /// Check if the descriptor references a generic metadata pattern.
    #[inline]
    pub fn has_generic_pattern(self) -> bool {
        self.ptr.read_i32(GENERIC_PATTERN) != 0
    }

    /// Word offset of the generic argument vector in the record.
    #[inline]
    pub fn generic_arguments_offset(self) -> u32 {
        self.ptr.read_u32(GENERIC_ARGUMENTS_OFFSET)
    }

    #[inline]
    pub fn generic_param_count(self) -> u32 {
        self.ptr.read_u32(GENERIC_PARAM_COUNT)
    }
}

/// The enclosing type of a nested struct or enum, if any.
pub(crate) fn parent(ty: TypeRef) -> Option<Metadata> {
    let parent = ty.raw().read_ptr(PARENT_SLOT);
    if parent.is_null() {
        None
    } else {
        Some(TypeRef::from_raw(parent).decode())
    }
}
