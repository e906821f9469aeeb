//! Indexer trait and query arguments

use std::fmt;

use super::errors::{IndexError, IndexResult};

/// A query argument handed to `Indexer::from_args`.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexArg {
    Str(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
}

impl IndexArg {
    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            IndexArg::Str(_) => "string",
            IndexArg::Int(_) => "int",
            IndexArg::Uint(_) => "uint",
            IndexArg::Float(_) => "float",
            IndexArg::Bool(_) => "bool",
            IndexArg::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for IndexArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexArg::Str(s) => write!(f, "{:?}", s),
            IndexArg::Int(i) => write!(f, "{}", i),
            IndexArg::Uint(u) => write!(f, "{}", u),
            IndexArg::Float(x) => write!(f, "{}", x),
            IndexArg::Bool(b) => write!(f, "{}", b),
            IndexArg::Bytes(b) => write!(f, "{:?}", b),
        }
    }
}

impl From<&str> for IndexArg {
    fn from(v: &str) -> Self {
        IndexArg::Str(v.to_string())
    }
}

impl From<String> for IndexArg {
    fn from(v: String) -> Self {
        IndexArg::Str(v)
    }
}

impl From<&String> for IndexArg {
    fn from(v: &String) -> Self {
        IndexArg::Str(v.clone())
    }
}

impl From<i64> for IndexArg {
    fn from(v: i64) -> Self {
        IndexArg::Int(v)
    }
}

impl From<i32> for IndexArg {
    fn from(v: i32) -> Self {
        IndexArg::Int(v as i64)
    }
}

impl From<u64> for IndexArg {
    fn from(v: u64) -> Self {
        IndexArg::Uint(v)
    }
}

impl From<u32> for IndexArg {
    fn from(v: u32) -> Self {
        IndexArg::Uint(v as u64)
    }
}

impl From<f64> for IndexArg {
    fn from(v: f64) -> Self {
        IndexArg::Float(v)
    }
}

impl From<bool> for IndexArg {
    fn from(v: bool) -> Self {
        IndexArg::Bool(v)
    }
}

impl From<Vec<u8>> for IndexArg {
    fn from(v: Vec<u8>) -> Self {
        IndexArg::Bytes(v)
    }
}

impl From<&[u8]> for IndexArg {
    fn from(v: &[u8]) -> Self {
        IndexArg::Bytes(v.to_vec())
    }
}

/// Derives index keys from records and lookup keys from query arguments.
///
/// Implementations must be pure: the same record always yields the same
/// keys. The store relies on this to find and remove a record's old keys.
pub trait Indexer<R>: Send + Sync {
    /// Keys for `record`. No keys means the record has no value for this
    /// index; more than one is only allowed for multi-valued indexers.
    fn from_object(&self, record: &R) -> IndexResult<Vec<Vec<u8>>>;

    /// Exact lookup key for `args`.
    fn from_args(&self, args: &[IndexArg]) -> IndexResult<Vec<u8>>;

    /// Prefix lookup key for `args`.
    fn prefix_from_args(&self, args: &[IndexArg]) -> IndexResult<Vec<u8>> {
        self.from_args(args)
    }

    /// Whether `from_object` may return several keys.
    fn is_multi(&self) -> bool {
        false
    }

    /// Short name of the encoding, used in diagnostics.
    fn kind(&self) -> &'static str;
}

/// Checks that exactly one argument was given and returns it.
pub(crate) fn single_arg(args: &[IndexArg]) -> IndexResult<&IndexArg> {
    match args {
        [arg] => Ok(arg),
        _ => Err(IndexError::bad_args(1, args.len())),
    }
}
