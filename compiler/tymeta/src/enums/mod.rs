//! Enum metadata: tagged unions, including the optional kind.
//!
//! The record carries only the kind word, the descriptor offset and the
//! parent pointer (same first three words as a struct). Cases are counted
//! in two segments: payload cases first, then no-payload cases, each in
//! declaration order. Names follow that order; the case type accessor
//! returns types for the payload segment only.
//!
//! Each case type word uses its low bit as the indirect flag: the payload
//! is boxed on the heap instead of stored inline. The bit is stripped
//! before the word is decoded as a type.

use crate::error::DecodeError;
use crate::nominal::{self, NominalDescriptor};
use crate::type_ref::TaggedRef;
use crate::{Kind, Metadata, TypeRef};

/// Bits of the packed count word holding the payload case count.
const PAYLOAD_COUNT_BITS: u32 = 12;
const PAYLOAD_COUNT_MASK: u32 = (1 << PAYLOAD_COUNT_BITS) - 1;

/// One case of an enum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Case {
    pub name: String,
    /// Payload type; `None` for no-payload cases and when the case type
    /// accessor is absent.
    pub ty: Option<Metadata>,
    /// Payload is stored out of line.
    pub indirect: bool,
}

/// View over an enum or optional metadata record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumMetadata {
    ty: TypeRef,
}

impl EnumMetadata {
    #[inline]
    pub(crate) const fn new(ty: TypeRef) -> Self {
        EnumMetadata { ty }
    }

    #[inline]
    pub fn type_ref(self) -> TypeRef {
        self.ty
    }

    #[inline]
    pub fn descriptor(self) -> NominalDescriptor {
        NominalDescriptor::of(self.ty)
    }

    /// Check if this is the single-payload optional kind.
    #[inline]
    pub fn is_optional(self) -> bool {
        self.ty.kind() == Kind::Optional
    }

    #[inline]
    pub fn payload_case_count(self) -> usize {
        (self.descriptor().primary_count() & PAYLOAD_COUNT_MASK) as usize
    }

    /// Payload size class, packed above the payload case count.
    #[inline]
    pub fn payload_size_class(self) -> u32 {
        self.descriptor().primary_count() >> PAYLOAD_COUNT_BITS
    }

    #[inline]
    pub fn no_payload_case_count(self) -> usize {
        self.descriptor().secondary_count() as usize
    }

    #[inline]
    pub fn total_case_count(self) -> usize {
        self.payload_case_count() + self.no_payload_case_count()
    }

    /// Case names: payload cases, then no-payload cases.
    pub fn case_names(self) -> Vec<String> {
        self.descriptor().names(self.total_case_count())
    }

    /// Payload types of the payload cases, indirect bits stripped.
    ///
    /// `None` when the descriptor has no case type accessor.
    pub fn case_types(self) -> Option<Vec<Metadata>> {
        let types = self.descriptor().type_vector(self.payload_case_count())?;
        Some(types.into_iter().map(TaggedRef::decode).collect())
    }

    /// Check if the case at `index` stores its payload indirectly.
    ///
    /// # Panics
    ///
    /// Panics if `index >= total_case_count()`.
    /// Use [`try_is_indirect`](Self::try_is_indirect) for a checked query.
    pub fn is_indirect(self, index: usize) -> bool {
        self.try_is_indirect(index).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Checked form of [`is_indirect`](Self::is_indirect).
    ///
    /// No-payload cases, and every case when the accessor is absent,
    /// report `false`.
    pub fn try_is_indirect(self, index: usize) -> Result<bool, DecodeError> {
        DecodeError::check_index("case", index, self.total_case_count())?;
        if index >= self.payload_case_count() {
            return Ok(false);
        }
        Ok(self.descriptor().type_at(index).is_some_and(|t| t.flag))
    }

    /// Check if the enum has generic parameters.
    #[inline]
    pub fn is_generic(self) -> bool {
        self.descriptor().has_generic_pattern()
    }

    /// The enclosing type, for nested enums.
    pub fn parent(self) -> Option<Metadata> {
        nominal::parent(self.ty)
    }

    /// Position of the case called `name`.
    pub fn case_index(self, name: &str) -> Option<usize> {
        self.case_names().iter().position(|n| n == name)
    }

    /// All cases in encoded order.
    pub fn cases(self) -> Vec<Case> {
        let payload_count = self.payload_case_count();
        let types = self.descriptor().type_vector(payload_count);
        self.case_names()
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let tagged = types.as_ref().and_then(|types| types.get(i));
                Case {
                    name,
                    ty: tagged.map(|t| t.decode()),
                    indirect: tagged.is_some_and(|t| t.flag),
                }
            })
            .collect()
    }
}
