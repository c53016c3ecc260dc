//! Tuple metadata.
//!
//! Tuples are self-contained: no descriptor indirection.
//!
//! | Offset | Content |
//! |--------|---------|
//! | `0` | kind word (9) |
//! | `1*W` | element count |
//! | `2*W + 2*W*i` | element `i` type |
//! | `3*W + 2*W*i` | element `i` byte offset |

use crate::raw::RawPtr;
use crate::type_ref::TaggedRef;
use crate::units::words;
use crate::{Metadata, TypeRef};

const COUNT: usize = words(1);
const ELEMENTS: usize = words(2);
/// Bytes per `(type, offset)` element pair.
const ELEMENT_STRIDE: usize = words(2);

/// One element of a tuple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub ty: Metadata,
    /// Byte offset of the element within a value.
    pub offset: usize,
}

/// View over a tuple metadata record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TupleMetadata {
    ty: TypeRef,
}

impl TupleMetadata {
    #[inline]
    pub(crate) const fn new(ty: TypeRef) -> Self {
        TupleMetadata { ty }
    }

    #[inline]
    pub fn type_ref(self) -> TypeRef {
        self.ty
    }

    #[inline]
    pub fn element_count(self) -> usize {
        self.ty.raw().read_word(COUNT)
    }

    #[inline]
    fn element_pair(self, index: usize) -> RawPtr {
        self.ty.raw().forward(ELEMENTS + index * ELEMENT_STRIDE)
    }

    /// Element type word at `index`, with its low-bit flag split off.
    ///
    /// Function records that pack their arguments into one tuple use the
    /// flag to mark inout arguments.
    #[inline]
    pub(crate) fn tagged_element(self, index: usize) -> TaggedRef {
        TaggedRef::read(self.element_pair(index), 0)
    }

    /// Element types in order.
    pub fn element_types(self) -> Vec<Metadata> {
        (0..self.element_count())
            .map(|i| self.tagged_element(i).decode())
            .collect()
    }

    /// Byte offset of each element, in order.
    pub fn element_offsets(self) -> Vec<usize> {
        (0..self.element_count())
            .map(|i| self.element_pair(i).read_word(words(1)))
            .collect()
    }

    /// Types and offsets zipped per element.
    pub fn elements(self) -> Vec<Element> {
        self.element_types()
            .into_iter()
            .zip(self.element_offsets())
            .map(|(ty, offset)| Element { ty, offset })
            .collect()
    }
}
