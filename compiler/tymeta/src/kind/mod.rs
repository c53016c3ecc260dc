//! Record kind tag for tag-driven dispatch.
//!
//! Every metadata record starts with a pointer-sized kind word. The value
//! selects which layout the rest of the record follows.
//!
//! # Tag Values
//!
//! | Value | Kind |
//! |-------|------|
//! | 1 | struct |
//! | 2 | enum |
//! | 3 | optional (single-payload enum) |
//! | 8 | opaque |
//! | 9 | tuple |
//! | 10 | function |
//! | 12 | existential |
//! | 13 | metatype |
//! | 14 | foreign class wrapper |
//! | 15 | existential metatype |
//! | 16 | foreign class |
//! | 64 | heap local variable |
//! | 65 | heap generic local variable |
//! | 128 | error object |
//! | other | class (the word is an isa pointer or a class tag) |

use std::fmt;

/// Metadata record kind.
///
/// Derived only from the kind word, so a handle always yields the same
/// kind. Unknown values classify as [`Kind::Class`] rather than failing.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Kind {
    /// Aggregate with named, stored fields.
    Struct,
    /// Tagged union.
    Enum,
    /// Tagged union with a single payload case and a single empty case.
    Optional,
    /// Builtin type with no further structure.
    Opaque,
    /// Fixed tuple.
    Tuple,
    /// Callable signature.
    Function,
    /// Dynamically dispatched interface bundle.
    Existential,
    /// Metatype of another type.
    Metatype,
    /// Wrapper around a foreign class object.
    ForeignClassWrapper,
    /// Metatype of an existential.
    ExistentialMetatype,
    /// Foreign class.
    ForeignClass,
    /// Heap box holding a captured local.
    HeapLocalVariable,
    /// Heap box holding a captured local of generic type.
    HeapGenericLocalVariable,
    /// Boxed error object.
    ErrorObject,
    /// Class-like reference type; the fallback for every other tag value.
    Class,
}

impl Kind {
    pub const STRUCT: usize = 1;
    pub const ENUM: usize = 2;
    pub const OPTIONAL: usize = 3;
    pub const OPAQUE: usize = 8;
    pub const TUPLE: usize = 9;
    pub const FUNCTION: usize = 10;
    pub const EXISTENTIAL: usize = 12;
    pub const METATYPE: usize = 13;
    pub const FOREIGN_CLASS_WRAPPER: usize = 14;
    pub const EXISTENTIAL_METATYPE: usize = 15;
    pub const FOREIGN_CLASS: usize = 16;
    pub const HEAP_LOCAL_VARIABLE: usize = 64;
    pub const HEAP_GENERIC_LOCAL_VARIABLE: usize = 65;
    pub const ERROR_OBJECT: usize = 128;

    /// Map a raw kind word to its kind.
    #[inline]
    pub const fn from_raw(tag: usize) -> Kind {
        match tag {
            Self::STRUCT => Kind::Struct,
            Self::ENUM => Kind::Enum,
            Self::OPTIONAL => Kind::Optional,
            Self::OPAQUE => Kind::Opaque,
            Self::TUPLE => Kind::Tuple,
            Self::FUNCTION => Kind::Function,
            Self::EXISTENTIAL => Kind::Existential,
            Self::METATYPE => Kind::Metatype,
            Self::FOREIGN_CLASS_WRAPPER => Kind::ForeignClassWrapper,
            Self::EXISTENTIAL_METATYPE => Kind::ExistentialMetatype,
            Self::FOREIGN_CLASS => Kind::ForeignClass,
            Self::HEAP_LOCAL_VARIABLE => Kind::HeapLocalVariable,
            Self::HEAP_GENERIC_LOCAL_VARIABLE => Kind::HeapGenericLocalVariable,
            Self::ERROR_OBJECT => Kind::ErrorObject,
            _ => Kind::Class,
        }
    }

    /// Check if this kind is decoded through a nominal descriptor.
    #[inline]
    pub const fn is_nominal(self) -> bool {
        matches!(self, Kind::Struct | Kind::Enum | Kind::Optional)
    }

    /// Check if this kind is a tagged union.
    #[inline]
    pub const fn is_enum(self) -> bool {
        matches!(self, Kind::Enum | Kind::Optional)
    }

    /// Check if values of this kind are reference-counted objects.
    #[inline]
    pub const fn is_class_like(self) -> bool {
        matches!(
            self,
            Kind::Class | Kind::ForeignClass | Kind::ForeignClassWrapper
        )
    }

    /// Get the name of this kind as a static string.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Kind::Struct => "struct",
            Kind::Enum => "enum",
            Kind::Optional => "optional",
            Kind::Opaque => "opaque",
            Kind::Tuple => "tuple",
            Kind::Function => "function",
            Kind::Existential => "existential",
            Kind::Metatype => "metatype",
            Kind::ForeignClassWrapper => "foreign_class_wrapper",
            Kind::ExistentialMetatype => "existential_metatype",
            Kind::ForeignClass => "foreign_class",
            Kind::HeapLocalVariable => "heap_local_variable",
            Kind::HeapGenericLocalVariable => "heap_generic_local_variable",
            Kind::ErrorObject => "error_object",
            Kind::Class => "class",
        }
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kind::{}", self.name())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
