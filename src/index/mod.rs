//! Index key derivation for memdb
//!
//! An index turns a record into zero or more byte keys, and a query into a
//! lookup key. Keys are stored in radix trees, so every encoding here must
//! sort byte-lexicographically in the same order as its values.
//!
//! # Invariants
//!
//! - Indexers are pure: equal records yield equal keys
//! - String keys are escaped and terminated so distinct values never prefix
//!   each other
//! - Multi-valued keys are returned sorted and deduplicated

mod errors;
mod fields;
mod indexer;
mod json;
mod key;

pub use errors::{IndexError, IndexErrorCode, IndexResult, Severity};
pub use fields::{
    BoolFieldIndex, CompoundIndex, ConditionalIndex, IntFieldIndex, StringFieldIndex,
    StringSliceFieldIndex, UintFieldIndex,
};
pub use indexer::{IndexArg, Indexer};
pub use json::JsonFieldIndex;
pub use key::{
    encode_bool, encode_float, encode_int, encode_str, encode_str_prefix, encode_uint, IndexKey,
    STRING_TERMINATOR,
};
