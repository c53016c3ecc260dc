//! Unit sizes used by every offset in the metadata layout.
//!
//! Primary records and tables are laid out in pointer-sized words.
//! Nominal descriptors are packed 32-bit fields, called half-words here
//! because they are half of a 64-bit word.

/// Size of a pointer-sized field.
pub const WORD: usize = std::mem::size_of::<usize>();

/// Size of a packed 32-bit descriptor field.
pub const HALF_WORD: usize = std::mem::size_of::<u32>();

/// Byte offset of the `n`th word.
#[inline]
pub(crate) const fn words(n: usize) -> usize {
    n * WORD
}

/// Byte offset of the `n`th half-word.
#[inline]
pub(crate) const fn half_words(n: usize) -> usize {
    n * HALF_WORD
}
