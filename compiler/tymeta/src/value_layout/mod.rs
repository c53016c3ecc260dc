//! Value witness tables: how values of a type are stored.
//!
//! Every metadata record is preceded by one pointer-sized slot holding the
//! address of its value witness table:
//!
//! ```text
//!   handle - WORD   handle
//!   +---------------+-----------+-----
//!   | witness table | kind word | ...
//!   +---------------+-----------+-----
//! ```
//!
//! The table holds [`WitnessOp::COUNT`] operation slots followed by
//! `size`, `flags` and `stride` words. Operation slots are exposed as raw
//! addresses and never called.

#![allow(
    clippy::cast_possible_truncation,
    reason = "the flag word only uses its low 32 bits"
)]

use bitflags::bitflags;

use crate::raw::RawPtr;
use crate::units::{words, WORD};
use crate::TypeRef;

/// Value-storage operation slots, in table order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum WitnessOp {
    DestroyBuffer = 0,
    InitializeBufferWithCopyOfBuffer = 1,
    ProjectBuffer = 2,
    DeallocateBuffer = 3,
    Destroy = 4,
    InitializeBufferWithCopy = 5,
    InitializeWithCopy = 6,
    AssignWithCopy = 7,
    InitializeBufferWithTake = 8,
    InitializeWithTake = 9,
    AssignWithTake = 10,
    AllocateBuffer = 11,
    InitializeBufferWithTakeOfBuffer = 12,
    DestroyArray = 13,
    InitializeArrayWithCopy = 14,
    InitializeArrayWithTakeFrontToBack = 15,
    InitializeArrayWithTakeBackToFront = 16,
}

impl WitnessOp {
    /// Number of operation slots at the start of the table.
    pub const COUNT: usize = 17;
}

/// Word index of the `size` field.
const SIZE_SLOT: usize = WitnessOp::COUNT;
/// Word index of the `flags` field.
const FLAGS_SLOT: usize = WitnessOp::COUNT + 1;
/// Word index of the `stride` field.
const STRIDE_SLOT: usize = WitnessOp::COUNT + 2;

bitflags! {
    /// The `flags` word of a value witness table.
    ///
    /// The low 16 bits are not flags: they hold the alignment mask
    /// (alignment minus one).
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize))]
    pub struct ValueWitnessFlags: u32 {
        const ALIGNMENT_MASK = 0xFFFF;
        /// Copying needs more than a bitwise copy.
        const IS_NON_POD = 1 << 16;
        /// Values do not fit in an inline existential buffer.
        const IS_NON_INLINE = 1 << 17;
        const HAS_EXTRA_INHABITANTS = 1 << 18;
        const HAS_SPARE_BITS = 1 << 19;
        /// Moving needs more than a bitwise copy.
        const IS_NON_BITWISE_TAKABLE = 1 << 20;
        /// The table is followed by enum-specific witnesses.
        const HAS_ENUM_WITNESSES = 1 << 21;
    }
}

impl ValueWitnessFlags {
    /// Alignment in bytes, from the alignment mask.
    #[inline]
    pub const fn alignment(self) -> usize {
        (self.bits() & Self::ALIGNMENT_MASK.bits()) as usize + 1
    }

    #[inline]
    pub const fn is_pod(self) -> bool {
        !self.contains(Self::IS_NON_POD)
    }

    #[inline]
    pub const fn is_inline(self) -> bool {
        !self.contains(Self::IS_NON_INLINE)
    }

    #[inline]
    pub const fn is_bitwise_takable(self) -> bool {
        !self.contains(Self::IS_NON_BITWISE_TAKABLE)
    }
}

/// Storage facts for values of one type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValueLayout {
    /// Bytes occupied by one value.
    pub size: usize,
    /// Required alignment in bytes.
    pub alignment: usize,
    /// Distance between consecutive values in an array.
    pub stride: usize,
    pub flags: ValueWitnessFlags,
}

/// View over a value witness table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ValueWitnessTable {
    ptr: RawPtr,
}

impl ValueWitnessTable {
    /// The table referenced from the slot just before `ty`'s record.
    #[inline]
    pub(crate) fn of(ty: TypeRef) -> Self {
        ValueWitnessTable {
            ptr: ty.raw().backward(WORD).read_ptr(0),
        }
    }

    /// Address of the table.
    #[inline]
    pub fn as_ptr(self) -> *const () {
        self.ptr.as_ptr().cast::<()>()
    }

    #[inline]
    pub fn size(self) -> usize {
        self.ptr.read_word(words(SIZE_SLOT))
    }

    #[inline]
    pub fn flags(self) -> ValueWitnessFlags {
        ValueWitnessFlags::from_bits_retain(self.ptr.read_word(words(FLAGS_SLOT)) as u32)
    }

    #[inline]
    pub fn alignment(self) -> usize {
        self.flags().alignment()
    }

    #[inline]
    pub fn stride(self) -> usize {
        self.ptr.read_word(words(STRIDE_SLOT))
    }

    /// Size, alignment, stride and flags in one read.
    pub fn layout(self) -> ValueLayout {
        let flags = self.flags();
        ValueLayout {
            size: self.size(),
            alignment: flags.alignment(),
            stride: self.stride(),
            flags,
        }
    }

    /// Raw address stored in an operation slot.
    ///
    /// The address belongs to the metadata producer and is never called
    /// from here.
    #[inline]
    pub fn operation(self, op: WitnessOp) -> *const () {
        self.ptr.read_ptr(words(op as usize)).as_ptr().cast::<()>()
    }
}
