//! Validation of remote entry names before they become local path components.
//!
//! Names come straight from the remote index. A name is accepted only if it is
//! a single normal path component, so joining it onto a directory can never
//! leave that directory. Unsafe names are rejected, not rewritten.

use std::fmt;

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Why an entry name was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsafeName {
    Empty,
    DotOrDotDot,
    Separator,
    Nul,
    TooLong,
}

impl fmt::Display for UnsafeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsafeName::Empty => write!(f, "empty name"),
            UnsafeName::DotOrDotDot => write!(f, "relative path component"),
            UnsafeName::Separator => write!(f, "contains a path separator"),
            UnsafeName::Nul => write!(f, "contains NUL"),
            UnsafeName::TooLong => write!(f, "longer than {} bytes", NAME_MAX),
        }
    }
}

/// Checks that `name` is safe to join onto a local directory.
pub fn validate_entry_name(name: &str) -> Result<&str, UnsafeName> {
    if name.is_empty() {
        return Err(UnsafeName::Empty);
    }
    if name == "." || name == ".." {
        return Err(UnsafeName::DotOrDotDot);
    }
    if name.contains('/') || name.contains('\\') {
        return Err(UnsafeName::Separator);
    }
    if name.contains('\0') {
        return Err(UnsafeName::Nul);
    }
    if name.len() > NAME_MAX {
        return Err(UnsafeName::TooLong);
    }
    Ok(name)
}
