//! Errors reported by the checked (`try_*`) accessors.

use thiserror::Error;

/// A precondition the caller broke while querying a decoded record.
///
/// Handle validity is not represented here: it is the safety contract of
/// [`TypeRef::from_ptr`](crate::TypeRef::from_ptr) and is never checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// An index was at or past the number of entries of that kind.
    #[error("{what} index {index} out of range (count is {count})")]
    IndexOutOfRange {
        /// What was indexed (`"case"`, `"argument"`, ...).
        what: &'static str,
        index: usize,
        count: usize,
    },
}

impl DecodeError {
    /// Check `index < count`, naming the indexed entity on failure.
    #[inline]
    pub(crate) fn check_index(what: &'static str, index: usize, count: usize) -> Result<(), Self> {
        if index < count {
            Ok(())
        } else {
            Err(DecodeError::IndexOutOfRange { what, index, count })
        }
    }
}
