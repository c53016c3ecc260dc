//! Lazy decoder for runtime type metadata.
//!
//! A host runtime publishes one metadata record per type: a kind word,
//! kind-specific fields, and a value witness table pointer just before the
//! record. This crate turns an address of such a record into typed views
//! (struct, enum, tuple, function, existential) and answers structural
//! questions by reading the record on demand. Nothing is cached and nothing
//! is copied out of the record until asked for.
//!
//! # Entry Points
//!
//! - [`TypeRef::from_ptr`]: wrap a host-supplied address (the only unsafe
//!   step; every accessor after it is safe)
//! - [`classify`]: read the [`Kind`] tag
//! - [`decode`]: pick the [`Metadata`] view for the kind
//! - [`describe()`]: walk the graph into an owned [`TypeShape`]
//!
//! # Architecture
//!
//! - **Raw reads** (`raw`): every dereference of metadata memory lives here
//! - **Kind tags** (`kind`): tag value to [`Kind`], unknown values to `Class`
//! - **Nominal descriptors** (`nominal`): shared by structs and enums
//! - **Views** (`structs`, `enums`, `tuple`, `function`, `existential`)
//! - **Value layout** (`value_layout`): size, alignment, stride, flags
//! - **Snapshots** (`describe`): cycle-safe owned trees
//!
//! # Debug Environment Variables
//!
//! - `RUST_LOG=tymeta=debug`: absent accessors, cycles and depth limits.
//! - `RUST_LOG=tymeta=trace`: every dispatch and packed-argument decision.
//!
//! Call [`init_tracing`] once to install a subscriber honoring `RUST_LOG`.

use std::sync::Once;

mod describe;
mod enums;
mod error;
mod existential;
mod function;
mod kind;
mod metadata;
mod nominal;
mod raw;
mod structs;
mod tuple;
mod type_ref;
mod units;
mod value_layout;

#[cfg(test)]
mod fixtures;

pub use describe::{
    describe, CaseShape, DescribeConfig, Describer, ElementShape, FieldShape, ParameterShape,
    TypeShape,
};
pub use enums::{Case, EnumMetadata};
pub use error::DecodeError;
pub use existential::{
    ExistentialMetadata, ExistentialRepresentation, InterfaceDescriptor, InterfaceFlags,
};
pub use function::{FunctionConvention, FunctionMetadata, Parameter};
pub use kind::Kind;
pub use metadata::{Metadata, OtherMetadata};
pub use nominal::NominalDescriptor;
pub use raw::{decode_name_table, TypeVectorAccessorFn};
pub use structs::{Field, StructMetadata};
pub use tuple::{Element, TupleMetadata};
pub use type_ref::{Tagged, TaggedRef, TypeRef};
pub use units::{HALF_WORD, WORD};
pub use value_layout::{ValueLayout, ValueWitnessFlags, ValueWitnessTable, WitnessOp};

/// Read the kind tag of a record.
///
/// Total: every tag value maps to some [`Kind`].
#[inline]
pub fn classify(ty: TypeRef) -> Kind {
    Kind::from_raw(ty.raw().read_word(0))
}

/// Decode a record into the view for its kind.
///
/// Repeated calls on the same handle yield equal views.
#[inline]
pub fn decode(ty: TypeRef) -> Metadata {
    Metadata::dispatch(ty)
}

static TRACING_INIT: Once = Once::new();

/// Install a `fmt` subscriber for the decoder's trace events.
///
/// Filters come from `RUST_LOG` (for example `RUST_LOG=tymeta=debug` to see
/// absent type accessors and cycle cuts during `describe`). Without
/// `RUST_LOG` no subscriber is installed, so a host's own subscriber is left
/// alone. Only the first call has any effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
