//! Kind-specific views, selected by the kind tag.

use crate::enums::EnumMetadata;
use crate::existential::ExistentialMetadata;
use crate::function::FunctionMetadata;
use crate::structs::StructMetadata;
use crate::tuple::TupleMetadata;
use crate::value_layout::ValueLayout;
use crate::{Kind, TypeRef};

/// A decoded metadata record.
///
/// Each variant wraps only the handle; every query re-reads the record.
/// Kinds without a dedicated decoder are [`Metadata::Other`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Metadata {
    Struct(StructMetadata),
    /// Enums and optionals.
    Enum(EnumMetadata),
    Tuple(TupleMetadata),
    Function(FunctionMetadata),
    Existential(ExistentialMetadata),
    Other(OtherMetadata),
}

/// A record decoded no further than its kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct OtherMetadata {
    ty: TypeRef,
}

impl OtherMetadata {
    #[inline]
    pub fn type_ref(self) -> TypeRef {
        self.ty
    }

    #[inline]
    pub fn kind(self) -> Kind {
        self.ty.kind()
    }
}

impl Metadata {
    /// Route a handle to the view for its kind.
    pub(crate) fn dispatch(ty: TypeRef) -> Metadata {
        let kind = crate::classify(ty);
        tracing::trace!(ty = ?ty, %kind, "decoding metadata");
        match kind {
            Kind::Struct => Metadata::Struct(StructMetadata::new(ty)),
            Kind::Enum | Kind::Optional => Metadata::Enum(EnumMetadata::new(ty)),
            Kind::Tuple => Metadata::Tuple(TupleMetadata::new(ty)),
            Kind::Function => Metadata::Function(FunctionMetadata::new(ty)),
            Kind::Existential => Metadata::Existential(ExistentialMetadata::new(ty)),
            Kind::Opaque
            | Kind::Metatype
            | Kind::ForeignClassWrapper
            | Kind::ExistentialMetatype
            | Kind::ForeignClass
            | Kind::HeapLocalVariable
            | Kind::HeapGenericLocalVariable
            | Kind::ErrorObject
            | Kind::Class => Metadata::Other(OtherMetadata { ty }),
        }
    }

    /// The handle this view wraps.
    pub fn type_ref(self) -> TypeRef {
        match self {
            Metadata::Struct(m) => m.type_ref(),
            Metadata::Enum(m) => m.type_ref(),
            Metadata::Tuple(m) => m.type_ref(),
            Metadata::Function(m) => m.type_ref(),
            Metadata::Existential(m) => m.type_ref(),
            Metadata::Other(m) => m.type_ref(),
        }
    }

    #[inline]
    pub fn kind(self) -> Kind {
        self.type_ref().kind()
    }

    /// Size, alignment and stride of values of this type.
    #[inline]
    pub fn value_layout(self) -> ValueLayout {
        self.type_ref().value_witnesses().layout()
    }

    pub fn as_struct(self) -> Option<StructMetadata> {
        match self {
            Metadata::Struct(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_enum(self) -> Option<EnumMetadata> {
        match self {
            Metadata::Enum(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_tuple(self) -> Option<TupleMetadata> {
        match self {
            Metadata::Tuple(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_function(self) -> Option<FunctionMetadata> {
        match self {
            Metadata::Function(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_existential(self) -> Option<ExistentialMetadata> {
        match self {
            Metadata::Existential(m) => Some(m),
            _ => None,
        }
    }
}
