//! Type handles.

use std::fmt;

use crate::raw::RawPtr;
use crate::value_layout::ValueWitnessTable;
use crate::{Kind, Metadata};

/// Opaque handle to one type's metadata record.
///
/// A `TypeRef` is a non-owning address. Two handles are equal exactly when
/// they point at the same record. All decoding is derived from the address
/// on demand; nothing is copied out of the record up front.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    ptr: RawPtr,
}

impl TypeRef {
    /// Wrap a metadata address supplied by the host runtime.
    ///
    /// # Safety
    ///
    /// `ptr` must point at the kind word of a well-formed metadata record,
    /// preceded by its value witness table pointer. The record, and every
    /// record, descriptor, name table and accessor it references, must stay
    /// live and unmodified for as long as the handle or anything decoded
    /// from it is used. No part of this is checked.
    #[inline]
    #[allow(unsafe_code, reason = "the handle's validity is the caller's contract")]
    pub unsafe fn from_ptr(ptr: *const ()) -> TypeRef {
        TypeRef {
            ptr: RawPtr::new(ptr.cast::<u8>()),
        }
    }

    /// Wrap a cursor already known to address a record.
    #[inline]
    pub(crate) const fn from_raw(ptr: RawPtr) -> TypeRef {
        TypeRef { ptr }
    }

    #[inline]
    pub(crate) const fn raw(self) -> RawPtr {
        self.ptr
    }

    /// The address this handle wraps.
    #[inline]
    pub fn as_ptr(self) -> *const () {
        self.ptr.as_ptr().cast::<()>()
    }

    /// The address as an integer.
    #[inline]
    pub fn addr(self) -> usize {
        self.ptr.addr()
    }

    /// Record kind, read from the leading kind word.
    #[inline]
    pub fn kind(self) -> Kind {
        crate::classify(self)
    }

    /// Decode this handle into its kind-specific view.
    #[inline]
    pub fn decode(self) -> Metadata {
        crate::decode(self)
    }

    /// The value witness table stored just before the record.
    #[inline]
    pub fn value_witnesses(self) -> ValueWitnessTable {
        ValueWitnessTable::of(self)
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({:?})", self.ptr)
    }
}

impl fmt::Pointer for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.ptr.as_ptr(), f)
    }
}

/// A value decoded from a field whose low bit carries a flag.
///
/// Inout arguments, indirect enum cases and class-constrained witness
/// counts all share one pointer-sized (or 32-bit) slot with a flag bit.
/// Decoding splits the slot once so the flagged raw value is never used
/// as-is.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tagged<T> {
    pub value: T,
    pub flag: bool,
}

/// A type reference with its flag bit split off.
pub type TaggedRef = Tagged<TypeRef>;

impl TaggedRef {
    /// Read the tagged type pointer at `offset` from `base`.
    #[inline]
    pub(crate) fn read(base: RawPtr, offset: usize) -> TaggedRef {
        let (ptr, flag) = base.read_tagged_ptr(offset);
        Tagged {
            value: TypeRef::from_raw(ptr),
            flag,
        }
    }

    /// Decode the referenced type.
    #[inline]
    pub fn decode(self) -> Metadata {
        self.value.decode()
    }
}
