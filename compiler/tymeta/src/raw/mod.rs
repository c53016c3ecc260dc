//! Raw reads over externally owned metadata memory.
//!
//! This is the only module that dereferences metadata addresses. Every
//! other module navigates records through [`RawPtr`] cursors, so the layout
//! formulas stay in safe code and the unchecked reads stay here.
//!
//! # Safety
//!
//! A `RawPtr` is only ever derived from a [`TypeRef`](crate::TypeRef),
//! whose unsafe constructor requires a live, well-formed metadata record.
//! Reads assume the record and everything it references follow the layout
//! schema; nothing here is bounds-checked.

#![allow(
    unsafe_code,
    reason = "metadata lives in host memory and can only be read through raw pointers"
)]
#![allow(
    clippy::cast_ptr_alignment,
    reason = "the layout places every typed field at an offset aligned for its type"
)]
#![allow(
    clippy::cast_possible_wrap,
    reason = "relative offsets are signed deltas applied with wrapping pointer arithmetic"
)]

use std::ffi::{c_char, CStr};
use std::fmt;

/// Low bit used as a flag on pointer-sized type references.
const TAG_BIT: usize = 1;

/// Read cursor into metadata memory.
///
/// Equality and hashing are by address.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct RawPtr(*const u8);

// SAFETY: metadata is immutable for the lifetime of the process, and a
// `RawPtr` only ever reads through it.
unsafe impl Send for RawPtr {}
// SAFETY: see `Send` above.
unsafe impl Sync for RawPtr {}

impl RawPtr {
    #[inline]
    pub(crate) const fn new(ptr: *const u8) -> Self {
        RawPtr(ptr)
    }

    #[inline]
    pub(crate) const fn as_ptr(self) -> *const u8 {
        self.0
    }

    #[inline]
    pub(crate) fn addr(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn is_null(self) -> bool {
        self.0.is_null()
    }

    /// Cursor `bytes` past this one.
    #[inline]
    #[must_use]
    pub(crate) fn forward(self, bytes: usize) -> Self {
        RawPtr(self.0.wrapping_add(bytes))
    }

    /// Cursor `bytes` before this one.
    #[inline]
    #[must_use]
    pub(crate) fn backward(self, bytes: usize) -> Self {
        RawPtr(self.0.wrapping_sub(bytes))
    }

    #[inline]
    fn displaced(self, delta: isize) -> Self {
        RawPtr(self.0.wrapping_offset(delta))
    }

    /// Pointer-sized unsigned field at `offset`.
    #[inline]
    pub(crate) fn read_word(self, offset: usize) -> usize {
        // SAFETY: module contract, the schema places a word here.
        unsafe { self.0.add(offset).cast::<usize>().read() }
    }

    /// Pointer-sized signed field at `offset`.
    #[inline]
    pub(crate) fn read_isize(self, offset: usize) -> isize {
        // SAFETY: module contract, the schema places a word here.
        unsafe { self.0.add(offset).cast::<isize>().read() }
    }

    /// Packed 32-bit unsigned field at `offset`.
    #[inline]
    pub(crate) fn read_u32(self, offset: usize) -> u32 {
        // SAFETY: module contract, the schema places a 32-bit field here.
        unsafe { self.0.add(offset).cast::<u32>().read() }
    }

    /// Packed 32-bit signed field at `offset`.
    #[inline]
    pub(crate) fn read_i32(self, offset: usize) -> i32 {
        // SAFETY: module contract, the schema places a 32-bit field here.
        unsafe { self.0.add(offset).cast::<i32>().read() }
    }

    /// Absolute pointer stored at `offset`.
    #[inline]
    pub(crate) fn read_ptr(self, offset: usize) -> RawPtr {
        // SAFETY: module contract, the schema places a pointer here.
        RawPtr(unsafe { self.0.add(offset).cast::<*const u8>().read() })
    }

    /// Pointer stored at `offset` whose low bit is a flag.
    ///
    /// The flag is stripped before the pointer is handed back, so the
    /// tagged value never escapes as an address.
    #[inline]
    pub(crate) fn read_tagged_ptr(self, offset: usize) -> (RawPtr, bool) {
        let tagged = self.read_ptr(offset);
        let flag = tagged.addr() & TAG_BIT != 0;
        let ptr = if flag { tagged.backward(TAG_BIT) } else { tagged };
        (ptr, flag)
    }

    /// Target of the word-sized relative offset stored at `offset`.
    ///
    /// The delta is measured from the slot holding it.
    #[inline]
    pub(crate) fn resolve_far(self, offset: usize) -> RawPtr {
        let slot = self.forward(offset);
        slot.displaced(slot.read_isize(0))
    }

    /// Target of the 32-bit relative offset stored at `offset`.
    ///
    /// The delta is measured from the slot holding it. A delta of zero
    /// resolves to the slot itself.
    #[inline]
    pub(crate) fn resolve_near(self, offset: usize) -> RawPtr {
        let slot = self.forward(offset);
        slot.displaced(slot.read_i32(0) as isize)
    }

    /// NUL-terminated string starting here, or `None` for a null cursor.
    pub(crate) fn read_c_str(self) -> Option<String> {
        if self.is_null() {
            return None;
        }
        // SAFETY: module contract, the schema places a C string here.
        let s = unsafe { CStr::from_ptr(self.0.cast::<c_char>()) };
        Some(s.to_string_lossy().into_owned())
    }
}

impl fmt::Debug for RawPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.addr())
    }
}

/// Read a name table: consecutive NUL-terminated strings ending with an
/// empty string.
///
/// Stops early after `max` names so a table is never read past the entry
/// count recorded next to it.
pub(crate) fn read_name_table(start: RawPtr, max: usize) -> Vec<String> {
    let mut names = Vec::with_capacity(max);
    let mut cursor = start;
    while names.len() < max {
        // SAFETY: module contract, each entry is a NUL-terminated string.
        let entry = unsafe { CStr::from_ptr(cursor.0.cast::<c_char>()) };
        let bytes = entry.to_bytes();
        if bytes.is_empty() {
            break;
        }
        names.push(String::from_utf8_lossy(bytes).into_owned());
        cursor = cursor.forward(bytes.len() + 1);
    }
    names
}

/// Decode a name table held in a byte slice.
///
/// Same format as the tables found in metadata: NUL-terminated strings,
/// ending at the first empty string (or the end of the slice).
///
/// ```
/// assert_eq!(tymeta::decode_name_table(b"alpha\0beta\0\0"), ["alpha", "beta"]);
/// ```
pub fn decode_name_table(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|&b| b == 0)
        .take_while(|name| !name.is_empty())
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect()
}

/// Signature of the type-vector accessors referenced by nominal descriptors.
///
/// The accessor receives the descriptor address and returns a pointer to a
/// contiguous array of pointer-sized type references. The array length is
/// not part of the call: it is the field or payload case count recorded in
/// the same descriptor.
pub type TypeVectorAccessorFn = unsafe extern "C" fn(descriptor: *const u8) -> *const usize;

/// A foreign type-vector accessor resolved from a descriptor slot.
///
/// This is the only path through which the decoder calls into code supplied
/// by the metadata producer.
#[derive(Copy, Clone)]
pub(crate) struct TypeVectorAccessor {
    func: TypeVectorAccessorFn,
}

impl TypeVectorAccessor {
    /// Resolve the 32-bit relative reference stored at `slot`.
    ///
    /// Returns `None` when the reference is absent: a target that is null or
    /// points back at the slot itself (a zero delta).
    pub(crate) fn resolve(slot: RawPtr) -> Option<Self> {
        let target = slot.resolve_near(0);
        if target.is_null() || target == slot {
            return None;
        }
        // SAFETY: module contract, a present reference designates a
        // function with the accessor signature.
        let func = unsafe { std::mem::transmute::<*const u8, TypeVectorAccessorFn>(target.0) };
        Some(TypeVectorAccessor { func })
    }

    /// Invoke the accessor for `descriptor`, returning the type vector.
    pub(crate) fn call(self, descriptor: RawPtr) -> RawPtr {
        // SAFETY: module contract, the producer's accessor accepts its own
        // descriptor and returns a vector that outlives the process.
        let vector = unsafe { (self.func)(descriptor.0) };
        RawPtr(vector.cast::<u8>())
    }
}

impl fmt::Debug for TypeVectorAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeVectorAccessor({:p})", self.func as *const ())
    }
}
