//! Crate-wide error type.
//!
//! User errors (`Duplicate`, `Syntax`) are non-fatal: the REPL prints them and
//! keeps looping. Every other variant is fatal — the caller prints a
//! diagnostic and terminates the process, per the store's failure model.
use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// The on-disk file length isn't a multiple of PAGE_SIZE, or a node's
    /// on-disk shape violates an invariant a traversal depends on.
    Corruption(String),
    /// A page index would reach the pager's fixed cache capacity.
    Capacity(String),
    /// Insert attempted on a key already present in the tree.
    Duplicate(u32),
    /// Malformed or unrecognised input at the statement-parser boundary.
    Syntax(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Corruption(msg) => write!(f, "Corrupt database: {}", msg),
            Error::Capacity(msg) => write!(f, "Capacity exceeded: {}", msg),
            Error::Duplicate(key) => write!(f, "Duplicate key: {}", key),
            Error::Syntax(msg) => write!(f, "Syntax error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

/// Shorthand for constructing a formatted error variant, mirroring the
/// `err!(Variant, "...", args)` idiom used throughout the storage layer.
#[macro_export]
macro_rules! err {
    ($variant:ident, $($arg:tt)*) => {
        $crate::errors::Error::$variant(format!($($arg)*))
    };
}
