//! Profile consistency errors.

use core::fmt;

use crate::KeyId;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProfileError {
    /// The layout table does not have exactly `drive x sense` entries.
    TableSize { expected: usize, actual: usize },
    /// A special key points outside the matrix.
    KeyOutOfRange { key: KeyId, key_count: usize },
    /// Two special-key entries for the same key.
    DuplicateSpecial { key: KeyId },
    /// The matrix is larger than the engine can track.
    TooManyKeys { key_count: usize, max: usize },
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::TableSize { expected, actual } => {
                write!(f, "layout table has {} entries, matrix has {} keys", actual, expected)
            }
            ProfileError::KeyOutOfRange { key, key_count } => {
                write!(f, "special key {} outside a {}-key matrix", key, key_count)
            }
            ProfileError::DuplicateSpecial { key } => {
                write!(f, "key {} listed twice in the special-key table", key)
            }
            ProfileError::TooManyKeys { key_count, max } => {
                write!(f, "{} keys exceeds the supported maximum of {}", key_count, max)
            }
        }
    }
}

impl core::error::Error for ProfileError {}
