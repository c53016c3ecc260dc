//! Hand-built metadata records for tests.
//!
//! Records are laid out byte for byte the way a host runtime would publish
//! them, in a static word pool. The pool lives in the binary's data segment
//! so that 32-bit relative offsets can reach both other records and the
//! type-vector accessor function. Nothing in the pool is ever freed.
//!
//! Only compiled in test builds.

#![allow(
    unsafe_code,
    reason = "fixtures write raw metadata records into a static pool"
)]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    reason = "Tests can panic"
)]

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::nominal::DESCRIPTOR_SIZE;
use crate::units::{half_words, words, WORD};
use crate::{Kind, TypeRef, TypeVectorAccessorFn, WitnessOp};

const POOL_WORDS: usize = 1 << 18;

struct Pool {
    words: UnsafeCell<[usize; POOL_WORDS]>,
    next: AtomicUsize,
}

// SAFETY: `alloc` hands out disjoint ranges, and each range is written only
// by the builder that allocated it, before any handle into it escapes.
unsafe impl Sync for Pool {}

static POOL: Pool = Pool {
    words: UnsafeCell::new([0; POOL_WORDS]),
    next: AtomicUsize::new(0),
};

/// A zeroed, word-aligned range of the pool.
#[derive(Copy, Clone)]
pub(crate) struct Block {
    base: *mut u8,
    len: usize,
}

/// Reserve `count` words.
pub(crate) fn alloc(count: usize) -> Block {
    let start = POOL.next.fetch_add(count, Ordering::Relaxed);
    assert!(start + count <= POOL_WORDS, "fixture pool exhausted");
    let base = POOL.words.get().cast::<usize>().wrapping_add(start).cast::<u8>();
    Block {
        base,
        len: words(count),
    }
}

impl Block {
    pub(crate) fn addr(self) -> *const u8 {
        self.base
    }

    fn slot<T>(self, offset: usize) -> *mut T {
        assert!(
            offset + std::mem::size_of::<T>() <= self.len,
            "write at {offset} past block of {} bytes",
            self.len
        );
        self.base.wrapping_add(offset).cast::<T>()
    }

    pub(crate) fn write_word(self, offset: usize, value: usize) {
        // SAFETY: in bounds and aligned, checked by `slot`.
        unsafe { self.slot::<usize>(offset).write(value) }
    }

    pub(crate) fn write_u32(self, offset: usize, value: u32) {
        // SAFETY: in bounds, checked by `slot`; offsets are 4-aligned.
        unsafe { self.slot::<u32>(offset).write(value) }
    }

    pub(crate) fn write_i32(self, offset: usize, value: i32) {
        // SAFETY: in bounds, checked by `slot`; offsets are 4-aligned.
        unsafe { self.slot::<i32>(offset).write(value) }
    }

    pub(crate) fn write_ptr(self, offset: usize, ptr: *const u8) {
        // SAFETY: in bounds and aligned, checked by `slot`.
        unsafe { self.slot::<*const u8>(offset).write(ptr) }
    }

    /// Store `ptr` with its low bit set when `flag` is.
    pub(crate) fn write_tagged(self, offset: usize, ptr: *const u8, flag: bool) {
        self.write_ptr(offset, if flag { ptr.wrapping_add(1) } else { ptr });
    }

    /// Store a word-sized offset from the slot at `offset` to `target`.
    pub(crate) fn write_far(self, offset: usize, target: *const u8) {
        let slot = self.base.wrapping_add(offset) as isize;
        self.write_word(offset, (target as isize - slot) as usize);
    }

    /// Store a 32-bit offset from the slot at `offset` to `target`.
    pub(crate) fn write_near(self, offset: usize, target: *const u8) {
        let slot = self.base.wrapping_add(offset) as isize;
        let delta = i32::try_from(target as isize - slot).expect("relative offset fits in 32 bits");
        self.write_i32(offset, delta);
    }
}

/// NUL-terminated copy of `s` in the pool.
pub(crate) fn cstring(s: &str) -> *const u8 {
    byte_string(s.as_bytes())
}

fn byte_string(bytes: &[u8]) -> *const u8 {
    let block = alloc(bytes.len() / WORD + 1);
    for (i, &b) in bytes.iter().enumerate() {
        // SAFETY: `alloc` reserved at least `len + 1` bytes.
        unsafe { block.base.add(i).write(b) }
    }
    block.addr()
}

/// Name table holding `names`, terminated by an empty string.
pub(crate) fn name_table(names: &[&str]) -> *const u8 {
    let mut bytes = Vec::new();
    for name in names {
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(0);
    }
    byte_string(&bytes)
}

/// Storage facts written into a fixture's value witness table.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Layout {
    pub size: usize,
    pub alignment: usize,
    pub stride: usize,
    /// Flag bits above the alignment mask.
    pub flags: u32,
}

impl Layout {
    pub(crate) const fn new(size: usize, alignment: usize, stride: usize) -> Self {
        Layout {
            size,
            alignment,
            stride,
            flags: 0,
        }
    }

    pub(crate) const fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout::new(8, 8, 8)
    }
}

/// Placeholder address stored in operation slot `index`.
pub(crate) const fn operation_address(index: usize) -> usize {
    0x1000 + 0x10 * index
}

fn witness_table(layout: Layout) -> Block {
    let table = alloc(WitnessOp::COUNT + 3);
    for i in 0..WitnessOp::COUNT {
        table.write_word(words(i), operation_address(i));
    }
    let mask = layout.alignment - 1;
    assert!(mask <= 0xFFFF, "alignment {} too large", layout.alignment);
    table.write_word(words(WitnessOp::COUNT), layout.size);
    table.write_word(words(WitnessOp::COUNT + 1), mask | layout.flags as usize);
    table.write_word(words(WitnessOp::COUNT + 2), layout.stride);
    table
}

/// A record of `count` words (kind word included), preceded by its value
/// witness table slot. Returns the block positioned at the kind word.
fn record(kind: usize, count: usize, layout: Layout) -> Block {
    let table = witness_table(layout);
    let block = alloc(count + 1);
    block.write_ptr(0, table.addr());
    let record = Block {
        base: block.base.wrapping_add(WORD),
        len: words(count),
    };
    record.write_word(0, kind);
    record
}

fn handle(record: Block) -> TypeRef {
    // SAFETY: `record` was laid out by this module and is never freed.
    unsafe { TypeRef::from_ptr(record.addr().cast::<()>()) }
}

/// A record with no structure beyond its kind word.
pub(crate) fn opaque(kind: usize) -> TypeRef {
    opaque_with_layout(kind, Layout::default())
}

pub(crate) fn opaque_with_layout(kind: usize, layout: Layout) -> TypeRef {
    handle(record(kind, 1, layout))
}

/// An 8-byte builtin scalar.
pub(crate) fn int() -> TypeRef {
    opaque(Kind::OPAQUE)
}

/// A 1-byte builtin scalar.
pub(crate) fn bool_type() -> TypeRef {
    opaque_with_layout(Kind::OPAQUE, Layout::new(1, 1, 1))
}

// Nominal descriptor fields, in half-words.
const NAME: usize = half_words(0);
const PRIMARY_COUNT: usize = half_words(1);
const SECONDARY_COUNT: usize = half_words(2);
const NAME_TABLE: usize = half_words(3);
const TYPE_ACCESSOR: usize = half_words(4);
const GENERIC_PATTERN: usize = half_words(5);
const GENERIC_ARGUMENTS_OFFSET: usize = half_words(6);
const GENERIC_PARAM_COUNT: usize = half_words(7);

/// Accessor installed in every fixture descriptor with types.
///
/// Fixture descriptors keep their type vector address in one extra word
/// right after the descriptor, so this can only return the right vector if
/// it is handed the descriptor's own address.
unsafe extern "C" fn fixture_type_vector(descriptor: *const u8) -> *const usize {
    // SAFETY: fixture descriptors are followed by the vector address.
    unsafe { descriptor.add(DESCRIPTOR_SIZE).cast::<*const usize>().read() }
}

/// Where a case or field type comes from.
#[derive(Copy, Clone)]
enum TypeSource {
    Type(TypeRef),
    /// The record being built.
    Itself,
}

struct DescriptorParts<'a> {
    name: Option<&'a str>,
    primary: u32,
    secondary: u32,
    names: Vec<&'a str>,
    /// Tagged entries for the accessor's vector; `None` leaves it absent.
    types: Option<Vec<(TypeSource, bool)>>,
    generic_pattern: bool,
    generic_params: u32,
}

fn descriptor(parts: &DescriptorParts<'_>, owner: *const u8) -> Block {
    let desc = alloc(DESCRIPTOR_SIZE / WORD + 1);
    if let Some(name) = parts.name {
        desc.write_near(NAME, cstring(name));
    }
    desc.write_u32(PRIMARY_COUNT, parts.primary);
    desc.write_u32(SECONDARY_COUNT, parts.secondary);
    desc.write_near(NAME_TABLE, name_table(&parts.names));
    if let Some(types) = &parts.types {
        let vector = alloc(types.len());
        for (i, &(source, flag)) in types.iter().enumerate() {
            let target = match source {
                TypeSource::Type(ty) => ty.as_ptr().cast::<u8>(),
                TypeSource::Itself => owner,
            };
            vector.write_tagged(words(i), target, flag);
        }
        let accessor: TypeVectorAccessorFn = fixture_type_vector;
        desc.write_near(TYPE_ACCESSOR, accessor as *const u8);
        desc.write_ptr(DESCRIPTOR_SIZE, vector.addr());
    }
    if parts.generic_pattern {
        desc.write_near(GENERIC_PATTERN, cstring("pattern"));
        desc.write_u32(GENERIC_ARGUMENTS_OFFSET, 3);
    }
    desc.write_u32(GENERIC_PARAM_COUNT, parts.generic_params);
    desc
}

/// Builder for struct records.
pub(crate) struct StructFixture {
    name: &'static str,
    fields: Vec<(&'static str, TypeRef, usize)>,
    field_types: bool,
    generic_params: u32,
    parent: Option<TypeRef>,
    layout: Layout,
}

impl StructFixture {
    pub(crate) fn new(name: &'static str) -> Self {
        StructFixture {
            name,
            fields: Vec::new(),
            field_types: true,
            generic_params: 0,
            parent: None,
            layout: Layout::default(),
        }
    }

    pub(crate) fn field(mut self, name: &'static str, ty: TypeRef, offset: usize) -> Self {
        self.fields.push((name, ty, offset));
        self
    }

    /// Leave the field type accessor out of the descriptor.
    pub(crate) fn without_field_types(mut self) -> Self {
        self.field_types = false;
        self
    }

    pub(crate) fn generic(mut self, params: u32) -> Self {
        self.generic_params = params;
        self
    }

    pub(crate) fn parent(mut self, parent: TypeRef) -> Self {
        self.parent = Some(parent);
        self
    }

    pub(crate) fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub(crate) fn build(self) -> TypeRef {
        let record = record(Kind::STRUCT, 3 + self.fields.len(), self.layout);
        let parts = DescriptorParts {
            name: Some(self.name),
            primary: self.fields.len() as u32,
            secondary: 3,
            names: self.fields.iter().map(|f| f.0).collect(),
            types: self.field_types.then(|| {
                self.fields
                    .iter()
                    .map(|f| (TypeSource::Type(f.1), false))
                    .collect()
            }),
            generic_pattern: self.generic_params != 0,
            generic_params: self.generic_params,
        };
        let desc = descriptor(&parts, record.addr());
        record.write_far(words(1), desc.addr());
        if let Some(parent) = self.parent {
            record.write_ptr(words(2), parent.as_ptr().cast::<u8>());
        }
        for (i, field) in self.fields.iter().enumerate() {
            record.write_word(words(3 + i), field.2);
        }
        handle(record)
    }
}

/// Builder for enum and optional records.
pub(crate) struct EnumFixture {
    name: &'static str,
    payload_cases: Vec<(&'static str, TypeSource, bool)>,
    empty_cases: Vec<&'static str>,
    size_class: u32,
    optional: bool,
    case_types: bool,
    generic: bool,
    layout: Layout,
}

impl EnumFixture {
    pub(crate) fn new(name: &'static str) -> Self {
        EnumFixture {
            name,
            payload_cases: Vec::new(),
            empty_cases: Vec::new(),
            size_class: 0,
            optional: false,
            case_types: true,
            generic: false,
            layout: Layout::default(),
        }
    }

    pub(crate) fn payload_case(mut self, name: &'static str, ty: TypeRef, indirect: bool) -> Self {
        self.payload_cases
            .push((name, TypeSource::Type(ty), indirect));
        self
    }

    /// Indirect payload case whose payload is the enum itself.
    pub(crate) fn recursive_case(mut self, name: &'static str) -> Self {
        self.payload_cases.push((name, TypeSource::Itself, true));
        self
    }

    pub(crate) fn empty_case(mut self, name: &'static str) -> Self {
        self.empty_cases.push(name);
        self
    }

    pub(crate) fn payload_size_class(mut self, class: u32) -> Self {
        self.size_class = class;
        self
    }

    /// Tag the record with the optional kind instead of enum.
    pub(crate) fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub(crate) fn without_case_types(mut self) -> Self {
        self.case_types = false;
        self
    }

    pub(crate) fn generic(mut self) -> Self {
        self.generic = true;
        self
    }

    pub(crate) fn build(self) -> TypeRef {
        let kind = if self.optional {
            Kind::OPTIONAL
        } else {
            Kind::ENUM
        };
        let record = record(kind, 3, self.layout);
        let parts = DescriptorParts {
            name: Some(self.name),
            primary: self.payload_cases.len() as u32 | (self.size_class << 12),
            secondary: self.empty_cases.len() as u32,
            names: self
                .payload_cases
                .iter()
                .map(|c| c.0)
                .chain(self.empty_cases.iter().copied())
                .collect(),
            types: self.case_types.then(|| {
                self.payload_cases
                    .iter()
                    .map(|c| (c.1, c.2))
                    .collect()
            }),
            generic_pattern: self.generic,
            generic_params: u32::from(self.generic),
        };
        let desc = descriptor(&parts, record.addr());
        record.write_far(words(1), desc.addr());
        handle(record)
    }
}

/// Tuple of `(type, offset)` elements.
pub(crate) fn tuple(elements: &[(TypeRef, usize)]) -> TypeRef {
    let flagged: Vec<_> = elements.iter().map(|&(ty, off)| (ty, off, false)).collect();
    tuple_with_flags(&flagged)
}

/// Tuple whose element type words carry a low-bit flag.
pub(crate) fn tuple_with_flags(elements: &[(TypeRef, usize, bool)]) -> TypeRef {
    let record = record(Kind::TUPLE, 2 + 2 * elements.len(), Layout::default());
    record.write_word(words(1), elements.len());
    for (i, &(ty, offset, flag)) in elements.iter().enumerate() {
        record.write_tagged(words(2 + 2 * i), ty.as_ptr().cast::<u8>(), flag);
        record.write_word(words(3 + 2 * i), offset);
    }
    handle(record)
}

/// Builder for function records.
pub(crate) struct FunctionFixture {
    result: TypeRef,
    arguments: Vec<(TypeRef, bool)>,
    declared_count: Option<usize>,
    throws: bool,
    convention: u8,
}

impl FunctionFixture {
    pub(crate) fn new(result: TypeRef) -> Self {
        FunctionFixture {
            result,
            arguments: Vec::new(),
            declared_count: None,
            throws: false,
            convention: 0,
        }
    }

    pub(crate) fn argument(mut self, ty: TypeRef, inout: bool) -> Self {
        self.arguments.push((ty, inout));
        self
    }

    /// Record `count` arguments regardless of how many slots are written.
    pub(crate) fn declared_count(mut self, count: usize) -> Self {
        self.declared_count = Some(count);
        self
    }

    pub(crate) fn throws(mut self) -> Self {
        self.throws = true;
        self
    }

    pub(crate) fn convention(mut self, convention: u8) -> Self {
        self.convention = convention;
        self
    }

    pub(crate) fn build(self) -> TypeRef {
        let count = self.declared_count.unwrap_or(self.arguments.len());
        let record = record(Kind::FUNCTION, 3 + self.arguments.len(), Layout::default());
        let flags = count
            | (usize::from(self.convention) << 24)
            | (usize::from(self.throws) << 28);
        record.write_word(words(1), flags);
        record.write_ptr(words(2), self.result.as_ptr().cast::<u8>());
        for (i, &(ty, inout)) in self.arguments.iter().enumerate() {
            record.write_tagged(words(3 + i), ty.as_ptr().cast::<u8>(), inout);
        }
        handle(record)
    }
}

/// Count word followed by descriptor pointers.
fn interface_list(interfaces: &[*const u8]) -> Block {
    let list = alloc(1 + interfaces.len());
    list.write_word(0, interfaces.len());
    for (i, &iface) in interfaces.iter().enumerate() {
        list.write_ptr(words(1 + i), iface);
    }
    list
}

/// Existential record composing `interfaces`.
pub(crate) fn existential(
    witness_tables: u32,
    class_constrained: bool,
    interfaces: &[*const u8],
) -> TypeRef {
    let record = record(Kind::EXISTENTIAL, 3 + interfaces.len(), Layout::new(40, 8, 40));
    let flags = witness_tables | (u32::from(class_constrained) << 31);
    record.write_word(words(1), flags as usize);
    record.write_word(words(2), interfaces.len());
    for (i, &iface) in interfaces.iter().enumerate() {
        record.write_ptr(words(3 + i), iface);
    }
    handle(record)
}

/// Size recorded in fixture interface descriptors.
pub(crate) const INTERFACE_DESCRIPTOR_SIZE: u32 = 72;

/// Interface descriptor named `name`, returned by address.
pub(crate) fn interface_descriptor(
    name: &str,
    inherited: Option<&[*const u8]>,
    flags: u32,
) -> *const u8 {
    let desc = alloc(9);
    desc.write_ptr(words(1), cstring(name));
    if let Some(inherited) = inherited {
        desc.write_ptr(words(2), interface_list(inherited).addr());
    }
    desc.write_u32(words(8), INTERFACE_DESCRIPTOR_SIZE);
    desc.write_u32(words(8) + 4, flags);
    desc.addr()
}
