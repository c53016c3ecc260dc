//! Function metadata: callable signatures.
//!
//! | Offset | Content |
//! |--------|---------|
//! | `0` | kind word (10) |
//! | `1*W` | flags: argument count (bits 0-23), convention (24-27), throws (28) |
//! | `2*W` | result type |
//! | `3*W + W*i` | argument slot `i`, low bit set for inout |
//!
//! # Packed arguments
//!
//! The encoding cannot tell "one tuple argument" from "several arguments"
//! by the slots alone. When the count is greater than one and the first
//! slot decodes to a tuple with exactly that many elements, the tuple holds
//! every argument and the remaining slots are not consulted. This check
//! runs before any per-slot inout bit is trusted.

use crate::error::DecodeError;
use crate::tuple::TupleMetadata;
use crate::type_ref::TaggedRef;
use crate::units::words;
use crate::{Metadata, TypeRef};

const FLAGS: usize = words(1);
const RESULT: usize = words(2);
const ARGUMENTS: usize = words(3);

const ARGUMENT_COUNT_MASK: usize = 0x00FF_FFFF;
const CONVENTION_MASK: usize = 0x0F00_0000;
const CONVENTION_SHIFT: u32 = 24;
const THROWS_MASK: usize = 0x1000_0000;

/// How a function value is represented and called.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FunctionConvention {
    /// Thick function: code pointer plus context.
    Native,
    /// Foreign block object.
    Block,
    /// Code pointer only, no context.
    Thin,
    /// Plain C function pointer.
    CFunctionPointer,
    /// A convention value this decoder does not name.
    Other(u8),
}

impl FunctionConvention {
    #[inline]
    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => FunctionConvention::Native,
            1 => FunctionConvention::Block,
            2 => FunctionConvention::Thin,
            3 => FunctionConvention::CFunctionPointer,
            other => FunctionConvention::Other(other),
        }
    }
}

/// One argument of a function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub ty: Metadata,
    /// Passed by mutable reference.
    pub inout: bool,
}

/// Where argument types are read from, per the packed-arguments rule.
#[derive(Copy, Clone)]
enum ArgumentSource {
    Slots,
    Packed(TupleMetadata),
}

/// View over a function metadata record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionMetadata {
    ty: TypeRef,
}

impl FunctionMetadata {
    #[inline]
    pub(crate) const fn new(ty: TypeRef) -> Self {
        FunctionMetadata { ty }
    }

    #[inline]
    pub fn type_ref(self) -> TypeRef {
        self.ty
    }

    #[inline]
    fn flags(self) -> usize {
        self.ty.raw().read_word(FLAGS)
    }

    #[inline]
    pub fn argument_count(self) -> usize {
        self.flags() & ARGUMENT_COUNT_MASK
    }

    #[inline]
    pub fn throws(self) -> bool {
        self.flags() & THROWS_MASK != 0
    }

    #[inline]
    pub fn convention(self) -> FunctionConvention {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "the convention field is four bits wide"
        )]
        let raw = ((self.flags() & CONVENTION_MASK) >> CONVENTION_SHIFT) as u8;
        FunctionConvention::from_raw(raw)
    }

    pub fn result_type(self) -> Metadata {
        TypeRef::from_raw(self.ty.raw().read_ptr(RESULT)).decode()
    }

    #[inline]
    fn slot(self, index: usize) -> TaggedRef {
        TaggedRef::read(self.ty.raw(), ARGUMENTS + words(index))
    }

    fn argument_source(self) -> ArgumentSource {
        let count = self.argument_count();
        if count > 1 {
            if let Metadata::Tuple(tuple) = self.slot(0).decode() {
                if tuple.element_count() == count {
                    tracing::trace!(function = ?self.ty, count, "arguments packed in tuple");
                    return ArgumentSource::Packed(tuple);
                }
            }
        }
        ArgumentSource::Slots
    }

    #[inline]
    fn tagged_argument(self, source: ArgumentSource, index: usize) -> TaggedRef {
        match source {
            ArgumentSource::Slots => self.slot(index),
            ArgumentSource::Packed(tuple) => tuple.tagged_element(index),
        }
    }

    fn checked_argument(self, index: usize) -> Result<TaggedRef, DecodeError> {
        DecodeError::check_index("argument", index, self.argument_count())?;
        Ok(self.tagged_argument(self.argument_source(), index))
    }

    /// Check if all arguments are packed into the tuple in the first slot.
    pub fn has_packed_arguments(self) -> bool {
        matches!(self.argument_source(), ArgumentSource::Packed(_))
    }

    /// Type of the argument at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= argument_count()`.
    /// Use [`try_argument_type`](Self::try_argument_type) for a checked query.
    pub fn argument_type(self, index: usize) -> Metadata {
        self.try_argument_type(index)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Checked form of [`argument_type`](Self::argument_type).
    pub fn try_argument_type(self, index: usize) -> Result<Metadata, DecodeError> {
        Ok(self.checked_argument(index)?.decode())
    }

    /// Check if the argument at `index` is passed by mutable reference.
    ///
    /// # Panics
    ///
    /// Panics if `index >= argument_count()`.
    /// Use [`try_is_param_inout`](Self::try_is_param_inout) for a checked query.
    pub fn is_param_inout(self, index: usize) -> bool {
        self.try_is_param_inout(index)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Checked form of [`is_param_inout`](Self::is_param_inout).
    pub fn try_is_param_inout(self, index: usize) -> Result<bool, DecodeError> {
        Ok(self.checked_argument(index)?.flag)
    }

    /// Check if any argument is passed by mutable reference.
    pub fn has_inout_arguments(self) -> bool {
        let source = self.argument_source();
        (0..self.argument_count()).any(|i| self.tagged_argument(source, i).flag)
    }

    /// Every argument in order.
    pub fn parameters(self) -> Vec<Parameter> {
        let source = self.argument_source();
        (0..self.argument_count())
            .map(|i| {
                let tagged = self.tagged_argument(source, i);
                Parameter {
                    ty: tagged.decode(),
                    inout: tagged.flag,
                }
            })
            .collect()
    }
}
