//! Existential metadata: dynamically dispatched interface bundles.
//!
//! | Offset | Content |
//! |--------|---------|
//! | `0` | kind word (12) |
//! | `1*W` | flags: witness table count (bits 0-30), class constraint (bit 31) |
//! | `2*W` | composed interface count |
//! | `3*W + W*i` | interface descriptor `i` |
//!
//! The count and descriptor vector starting at `2*W` have the same shape
//! as the inherited-interface lists referenced from interface descriptors.

#![allow(
    clippy::cast_possible_truncation,
    reason = "the flag word only uses its low 32 bits"
)]

use std::ffi::c_char;

use bitflags::bitflags;

use crate::raw::RawPtr;
use crate::type_ref::Tagged;
use crate::units::{words, HALF_WORD};
use crate::TypeRef;

const FLAGS: usize = words(1);
const INTERFACE_LIST: usize = words(2);

const WITNESS_TABLE_COUNT_MASK: u32 = 0x7FFF_FFFF;
const CLASS_CONSTRAINT_MASK: u32 = 0x8000_0000;

/// Which values an existential admits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExistentialRepresentation {
    /// No interfaces, any value.
    Any,
    /// No interfaces, any reference-counted object.
    AnyObject,
    /// One or more composed interfaces.
    Composition,
}

/// View over an existential metadata record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExistentialMetadata {
    ty: TypeRef,
}

impl ExistentialMetadata {
    #[inline]
    pub(crate) const fn new(ty: TypeRef) -> Self {
        ExistentialMetadata { ty }
    }

    #[inline]
    pub fn type_ref(self) -> TypeRef {
        self.ty
    }

    /// Witness table count, with the class-constraint bit as its flag.
    #[inline]
    fn flags(self) -> Tagged<u32> {
        let raw = self.ty.raw().read_word(FLAGS) as u32;
        Tagged {
            value: raw & WITNESS_TABLE_COUNT_MASK,
            flag: raw & CLASS_CONSTRAINT_MASK != 0,
        }
    }

    #[inline]
    pub fn witness_table_count(self) -> usize {
        self.flags().value as usize
    }

    /// Check if only reference-counted objects can inhabit the type.
    #[inline]
    pub fn has_class_constraint(self) -> bool {
        self.flags().flag
    }

    #[inline]
    pub fn composed_interface_count(self) -> usize {
        self.ty.raw().read_word(INTERFACE_LIST)
    }

    /// Descriptors of the composed interfaces.
    pub fn interface_descriptors(self) -> Vec<InterfaceDescriptor> {
        read_interface_list(self.ty.raw().forward(INTERFACE_LIST))
    }

    pub fn representation(self) -> ExistentialRepresentation {
        match (self.composed_interface_count(), self.has_class_constraint()) {
            (0, false) => ExistentialRepresentation::Any,
            (0, true) => ExistentialRepresentation::AnyObject,
            _ => ExistentialRepresentation::Composition,
        }
    }
}

/// Read a count word followed by that many descriptor pointers.
fn read_interface_list(list: RawPtr) -> Vec<InterfaceDescriptor> {
    let count = list.read_word(0);
    (0..count)
        .map(|i| InterfaceDescriptor {
            ptr: list.read_ptr(words(1 + i)),
        })
        .collect()
}

bitflags! {
    /// Flags word of an interface descriptor.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct InterfaceFlags: u32 {
        /// Declared natively rather than imported.
        const IS_SWIFT = 1 << 0;
        /// Only reference-counted objects can conform.
        const CLASS_CONSTRAINED = 1 << 1;
        /// Conformances carry a witness table.
        const NEEDS_WITNESS_TABLE = 1 << 2;
        const IS_RESILIENT = 1 << 3;
        /// Two-bit special-interface identifier.
        const SPECIAL_INTERFACE_MASK = 0b11 << 6;
    }
}

const SPECIAL_INTERFACE_SHIFT: u32 = 6;

// Interface descriptor layout.
const DESCRIPTOR_NAME: usize = words(1);
const DESCRIPTOR_INHERITED: usize = words(2);
// Five legacy slots sit between the inherited list and the size field.
const DESCRIPTOR_SIZE_FIELD: usize = words(8);
const DESCRIPTOR_FLAGS: usize = words(8) + HALF_WORD;

/// View over an interface descriptor.
///
/// The descriptor is external data: its structure is exposed, but its name
/// is handed back as a raw pointer and not interpreted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InterfaceDescriptor {
    ptr: RawPtr,
}

impl InterfaceDescriptor {
    /// Address of the descriptor.
    #[inline]
    pub fn as_ptr(self) -> *const () {
        self.ptr.as_ptr().cast::<()>()
    }

    /// Raw name pointer.
    #[inline]
    pub fn name_ptr(self) -> *const c_char {
        self.ptr.read_ptr(DESCRIPTOR_NAME).as_ptr().cast::<c_char>()
    }

    /// Inherited interfaces, or `None` when the descriptor has no list.
    pub fn inherited(self) -> Option<Vec<InterfaceDescriptor>> {
        let list = self.ptr.read_ptr(DESCRIPTOR_INHERITED);
        if list.is_null() {
            None
        } else {
            Some(read_interface_list(list))
        }
    }

    /// Size of the descriptor record in bytes, as recorded in it.
    #[inline]
    pub fn descriptor_size(self) -> u32 {
        self.ptr.read_u32(DESCRIPTOR_SIZE_FIELD)
    }

    #[inline]
    pub fn flags(self) -> InterfaceFlags {
        InterfaceFlags::from_bits_retain(self.ptr.read_u32(DESCRIPTOR_FLAGS))
    }

    /// Special-interface identifier (0 when the interface is not special).
    #[inline]
    pub fn special_interface(self) -> u8 {
        let bits = self.flags() & InterfaceFlags::SPECIAL_INTERFACE_MASK;
        (bits.bits() >> SPECIAL_INTERFACE_SHIFT) as u8
    }
}
