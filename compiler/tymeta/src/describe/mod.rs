//! Owned snapshots of a type graph.
//!
//! The decoder views are lazy and hold nothing but a handle. When a caller
//! wants the whole structure at once (to print it, compare it, or serialize
//! it with the `serde` feature), [`describe`] walks the graph through
//! [`decode`](crate::decode) and builds a [`TypeShape`] tree.
//!
//! # Recursion
//!
//! Metadata graphs may refer back to themselves: an indirect enum case can
//! hold its own enum. The walk tracks the handles on the current path and
//! reports a revisit as [`TypeShape::Cycle`] instead of descending again.
//! [`DescribeConfig::max_depth`] bounds very deep but acyclic graphs, and
//! the walk grows the stack on demand.

use std::fmt;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::existential::ExistentialMetadata;
use crate::{Kind, Metadata, TypeRef};

/// Inline capacity of shape lists; most types have few members.
type ShapeList<T> = SmallVec<[T; 4]>;

/// Headroom left before a nested type is visited (100KB).
#[cfg(not(target_arch = "wasm32"))]
const RED_ZONE: usize = 100 * 1024;

/// Segment size allocated when a deep type graph exhausts the headroom (1MB).
#[cfg(not(target_arch = "wasm32"))]
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run one level of the walk, growing the stack first if it is low.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// Settings for [`Describer`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DescribeConfig {
    /// Nesting depth past which types are reported as
    /// [`TypeShape::Truncated`].
    pub max_depth: usize,
}

impl Default for DescribeConfig {
    fn default() -> Self {
        DescribeConfig { max_depth: 64 }
    }
}

/// Owned description of one type and everything it contains.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TypeShape {
    Struct {
        name: Option<String>,
        fields: ShapeList<FieldShape>,
    },
    Enum {
        name: Option<String>,
        optional: bool,
        cases: ShapeList<CaseShape>,
    },
    Tuple {
        elements: ShapeList<ElementShape>,
    },
    Function {
        parameters: ShapeList<ParameterShape>,
        result: Box<TypeShape>,
        throws: bool,
    },
    Existential {
        class_constrained: bool,
        interfaces: usize,
        witness_tables: usize,
    },
    /// A kind without a dedicated decoder.
    Other { kind: Kind },
    /// A type already being described further up the current path.
    Cycle { address: usize },
    /// A type past the configured depth limit.
    Truncated { address: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldShape {
    pub name: String,
    pub offset: usize,
    /// `None` when the struct has no field type accessor.
    pub ty: Option<Box<TypeShape>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CaseShape {
    pub name: String,
    pub indirect: bool,
    pub payload: Option<Box<TypeShape>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ElementShape {
    pub offset: usize,
    pub ty: Box<TypeShape>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ParameterShape {
    pub inout: bool,
    pub ty: Box<TypeShape>,
}

/// Walks a type graph into a [`TypeShape`].
///
/// Reusable across calls; the visited set is empty between them.
pub struct Describer {
    config: DescribeConfig,
    /// Handles on the path from the root to the type being described.
    visiting: FxHashSet<TypeRef>,
}

impl Describer {
    pub fn new(config: DescribeConfig) -> Self {
        Describer {
            config,
            visiting: FxHashSet::default(),
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn describe(&mut self, ty: TypeRef) -> TypeShape {
        self.visit(ty)
    }

    fn visit(&mut self, ty: TypeRef) -> TypeShape {
        if self.visiting.contains(&ty) {
            tracing::debug!(?ty, "cycle in type graph");
            return TypeShape::Cycle { address: ty.addr() };
        }
        if self.visiting.len() >= self.config.max_depth {
            tracing::debug!(?ty, max_depth = self.config.max_depth, "depth limit reached");
            return TypeShape::Truncated { address: ty.addr() };
        }

        ensure_sufficient_stack(|| {
            self.visiting.insert(ty);
            let shape = self.shape_of(ty.decode());
            self.visiting.remove(&ty);
            shape
        })
    }

    fn shape_of(&mut self, metadata: Metadata) -> TypeShape {
        match metadata {
            Metadata::Struct(s) => {
                let types = s.field_types();
                let fields = s
                    .field_names()
                    .into_iter()
                    .zip(s.field_offsets())
                    .enumerate()
                    .map(|(i, (name, offset))| FieldShape {
                        name,
                        offset,
                        ty: types
                            .as_ref()
                            .and_then(|types| types.get(i))
                            .map(|t| Box::new(self.visit(t.type_ref()))),
                    })
                    .collect();
                TypeShape::Struct {
                    name: s.descriptor().mangled_name(),
                    fields,
                }
            }
            Metadata::Enum(e) => {
                let cases = e
                    .cases()
                    .into_iter()
                    .map(|case| CaseShape {
                        payload: case.ty.map(|t| Box::new(self.visit(t.type_ref()))),
                        name: case.name,
                        indirect: case.indirect,
                    })
                    .collect();
                TypeShape::Enum {
                    name: e.descriptor().mangled_name(),
                    optional: e.is_optional(),
                    cases,
                }
            }
            Metadata::Tuple(t) => {
                let elements = t
                    .elements()
                    .into_iter()
                    .map(|el| ElementShape {
                        offset: el.offset,
                        ty: Box::new(self.visit(el.ty.type_ref())),
                    })
                    .collect();
                TypeShape::Tuple { elements }
            }
            Metadata::Function(f) => {
                let parameters = f
                    .parameters()
                    .into_iter()
                    .map(|p| ParameterShape {
                        inout: p.inout,
                        ty: Box::new(self.visit(p.ty.type_ref())),
                    })
                    .collect();
                TypeShape::Function {
                    parameters,
                    result: Box::new(self.visit(f.result_type().type_ref())),
                    throws: f.throws(),
                }
            }
            Metadata::Existential(e) => existential_shape(e),
            Metadata::Other(o) => TypeShape::Other { kind: o.kind() },
        }
    }
}

fn existential_shape(e: ExistentialMetadata) -> TypeShape {
    TypeShape::Existential {
        class_constrained: e.has_class_constraint(),
        interfaces: e.composed_interface_count(),
        witness_tables: e.witness_table_count(),
    }
}

/// Describe `ty` with the default configuration.
pub fn describe(ty: TypeRef) -> TypeShape {
    Describer::new(DescribeConfig::default()).describe(ty)
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeShape::Struct { name, fields } => {
                write!(f, "struct {}", name.as_deref().unwrap_or("_"))?;
                if fields.is_empty() {
                    return Ok(());
                }
                f.write_str(" { ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: ", field.name)?;
                    match &field.ty {
                        Some(ty) => write!(f, "{ty}")?,
                        None => f.write_str("?")?,
                    }
                }
                f.write_str(" }")
            }
            TypeShape::Enum {
                name,
                optional,
                cases,
            } => {
                let keyword = if *optional { "optional" } else { "enum" };
                write!(f, "{keyword} {}", name.as_deref().unwrap_or("_"))?;
                if cases.is_empty() {
                    return Ok(());
                }
                f.write_str(" { ")?;
                for (i, case) in cases.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if case.indirect {
                        f.write_str("indirect ")?;
                    }
                    f.write_str(&case.name)?;
                    if let Some(payload) = &case.payload {
                        write!(f, "({payload})")?;
                    }
                }
                f.write_str(" }")
            }
            TypeShape::Tuple { elements } => {
                f.write_str("(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", element.ty)?;
                }
                f.write_str(")")
            }
            TypeShape::Function {
                parameters,
                result,
                throws,
            } => {
                f.write_str("(")?;
                for (i, param) in parameters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if param.inout {
                        f.write_str("inout ")?;
                    }
                    write!(f, "{}", param.ty)?;
                }
                f.write_str(")")?;
                if *throws {
                    f.write_str(" throws")?;
                }
                write!(f, " -> {result}")
            }
            TypeShape::Existential {
                class_constrained,
                interfaces,
                ..
            } => match (interfaces, class_constrained) {
                (0, false) => f.write_str("any"),
                (0, true) => f.write_str("any object"),
                (n, _) => write!(f, "any <{n} interfaces>"),
            },
            TypeShape::Other { kind } => write!(f, "<{kind}>"),
            TypeShape::Cycle { address } => write!(f, "<cycle {address:#x}>"),
            TypeShape::Truncated { .. } => f.write_str("..."),
        }
    }
}
