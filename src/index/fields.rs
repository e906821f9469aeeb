//! Built-in indexers over typed records
//!
//! Each indexer wraps an extraction closure, so any record type can be
//! indexed without implementing `Indexer` by hand.

use std::sync::Arc;

use super::errors::{IndexError, IndexResult};
use super::indexer::{single_arg, IndexArg, Indexer};
use super::key::{encode_bool, encode_int, encode_str, encode_str_prefix, encode_uint};

type Extract<R, T> = Box<dyn Fn(&R) -> T + Send + Sync>;

/// Indexes a string field. Empty strings count as "no value".
pub struct StringFieldIndex<R> {
    extract: Extract<R, Option<String>>,
    lowercase: bool,
}

impl<R> StringFieldIndex<R> {
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&R) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            extract: Box::new(extract),
            lowercase: false,
        }
    }

    /// Compare case-insensitively by lowercasing keys and arguments.
    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }
}

fn str_arg(args: &[IndexArg]) -> IndexResult<&str> {
    match single_arg(args)? {
        IndexArg::Str(s) => Ok(s),
        other => Err(IndexError::type_mismatch("string", other.type_name())),
    }
}

impl<R> Indexer<R> for StringFieldIndex<R> {
    fn from_object(&self, record: &R) -> IndexResult<Vec<Vec<u8>>> {
        Ok(match (self.extract)(record) {
            Some(s) if !s.is_empty() => vec![encode_str(&s, self.lowercase)],
            _ => Vec::new(),
        })
    }

    fn from_args(&self, args: &[IndexArg]) -> IndexResult<Vec<u8>> {
        Ok(encode_str(str_arg(args)?, self.lowercase))
    }

    fn prefix_from_args(&self, args: &[IndexArg]) -> IndexResult<Vec<u8>> {
        Ok(encode_str_prefix(str_arg(args)?, self.lowercase))
    }

    fn kind(&self) -> &'static str {
        "string"
    }
}

/// Multi-valued index over a list of strings.
pub struct StringSliceFieldIndex<R> {
    extract: Extract<R, Vec<String>>,
    lowercase: bool,
}

impl<R> StringSliceFieldIndex<R> {
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&R) -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            extract: Box::new(extract),
            lowercase: false,
        }
    }

    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }
}

impl<R> Indexer<R> for StringSliceFieldIndex<R> {
    fn from_object(&self, record: &R) -> IndexResult<Vec<Vec<u8>>> {
        let mut keys: Vec<Vec<u8>> = (self.extract)(record)
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| encode_str(s, self.lowercase))
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn from_args(&self, args: &[IndexArg]) -> IndexResult<Vec<u8>> {
        Ok(encode_str(str_arg(args)?, self.lowercase))
    }

    fn prefix_from_args(&self, args: &[IndexArg]) -> IndexResult<Vec<u8>> {
        Ok(encode_str_prefix(str_arg(args)?, self.lowercase))
    }

    fn is_multi(&self) -> bool {
        true
    }

    fn kind(&self) -> &'static str {
        "string_slice"
    }
}

/// Indexes a signed integer field.
pub struct IntFieldIndex<R> {
    extract: Extract<R, Option<i64>>,
}

impl<R> IntFieldIndex<R> {
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&R) -> Option<i64> + Send + Sync + 'static,
    {
        Self {
            extract: Box::new(extract),
        }
    }
}

impl<R> Indexer<R> for IntFieldIndex<R> {
    fn from_object(&self, record: &R) -> IndexResult<Vec<Vec<u8>>> {
        Ok((self.extract)(record)
            .map(|v| encode_int(v).to_vec())
            .into_iter()
            .collect())
    }

    fn from_args(&self, args: &[IndexArg]) -> IndexResult<Vec<u8>> {
        let value = match single_arg(args)? {
            IndexArg::Int(v) => *v,
            IndexArg::Uint(v) => i64::try_from(*v)
                .map_err(|_| IndexError::unsupported_value(format!("{} overflows int", v)))?,
            other => return Err(IndexError::type_mismatch("int", other.type_name())),
        };
        Ok(encode_int(value).to_vec())
    }

    fn kind(&self) -> &'static str {
        "int"
    }
}

/// Indexes an unsigned integer field.
pub struct UintFieldIndex<R> {
    extract: Extract<R, Option<u64>>,
}

impl<R> UintFieldIndex<R> {
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&R) -> Option<u64> + Send + Sync + 'static,
    {
        Self {
            extract: Box::new(extract),
        }
    }
}

impl<R> Indexer<R> for UintFieldIndex<R> {
    fn from_object(&self, record: &R) -> IndexResult<Vec<Vec<u8>>> {
        Ok((self.extract)(record)
            .map(|v| encode_uint(v).to_vec())
            .into_iter()
            .collect())
    }

    fn from_args(&self, args: &[IndexArg]) -> IndexResult<Vec<u8>> {
        let value = match single_arg(args)? {
            IndexArg::Uint(v) => *v,
            IndexArg::Int(v) => u64::try_from(*v)
                .map_err(|_| IndexError::unsupported_value(format!("{} is negative", v)))?,
            other => return Err(IndexError::type_mismatch("uint", other.type_name())),
        };
        Ok(encode_uint(value).to_vec())
    }

    fn kind(&self) -> &'static str {
        "uint"
    }
}

/// Indexes a boolean field.
pub struct BoolFieldIndex<R> {
    extract: Extract<R, Option<bool>>,
}

impl<R> BoolFieldIndex<R> {
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&R) -> Option<bool> + Send + Sync + 'static,
    {
        Self {
            extract: Box::new(extract),
        }
    }
}

fn bool_arg(args: &[IndexArg]) -> IndexResult<Vec<u8>> {
    match single_arg(args)? {
        IndexArg::Bool(b) => Ok(encode_bool(*b).to_vec()),
        other => Err(IndexError::type_mismatch("bool", other.type_name())),
    }
}

impl<R> Indexer<R> for BoolFieldIndex<R> {
    fn from_object(&self, record: &R) -> IndexResult<Vec<Vec<u8>>> {
        Ok((self.extract)(record)
            .map(|v| encode_bool(v).to_vec())
            .into_iter()
            .collect())
    }

    fn from_args(&self, args: &[IndexArg]) -> IndexResult<Vec<u8>> {
        bool_arg(args)
    }

    fn kind(&self) -> &'static str {
        "bool"
    }
}

/// Indexes the outcome of a predicate; every record has a value.
pub struct ConditionalIndex<R> {
    predicate: Extract<R, bool>,
}

impl<R> ConditionalIndex<R> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl<R> Indexer<R> for ConditionalIndex<R> {
    fn from_object(&self, record: &R) -> IndexResult<Vec<Vec<u8>>> {
        Ok(vec![encode_bool((self.predicate)(record)).to_vec()])
    }

    fn from_args(&self, args: &[IndexArg]) -> IndexResult<Vec<u8>> {
        bool_arg(args)
    }

    fn kind(&self) -> &'static str {
        "conditional"
    }
}

/// Concatenation of single-valued indexers.
///
/// With `allow_missing`, trailing components may be absent and the record is
/// indexed by the components it has; otherwise any absent component means
/// the record has no value.
pub struct CompoundIndex<R> {
    parts: Vec<Arc<dyn Indexer<R>>>,
    allow_missing: bool,
}

impl<R> CompoundIndex<R> {
    pub fn new(parts: Vec<Arc<dyn Indexer<R>>>) -> Self {
        Self {
            parts,
            allow_missing: false,
        }
    }

    pub fn allow_missing(mut self) -> Self {
        self.allow_missing = true;
        self
    }
}

impl<R> Indexer<R> for CompoundIndex<R> {
    fn from_object(&self, record: &R) -> IndexResult<Vec<Vec<u8>>> {
        let mut key = Vec::new();
        for (i, part) in self.parts.iter().enumerate() {
            let mut keys = part.from_object(record)?;
            match keys.len() {
                0 if self.allow_missing && i > 0 => break,
                0 => return Ok(Vec::new()),
                1 => key.append(&mut keys[0]),
                _ => {
                    return Err(IndexError::unsupported_value(
                        "compound index components must be single-valued",
                    ))
                }
            }
        }
        Ok(vec![key])
    }

    fn from_args(&self, args: &[IndexArg]) -> IndexResult<Vec<u8>> {
        if args.len() != self.parts.len() {
            return Err(IndexError::bad_args(self.parts.len(), args.len()));
        }
        let mut key = Vec::new();
        for (part, arg) in self.parts.iter().zip(args) {
            key.extend(part.from_args(std::slice::from_ref(arg))?);
        }
        Ok(key)
    }

    /// Leading components match exactly; the last given one is a prefix.
    fn prefix_from_args(&self, args: &[IndexArg]) -> IndexResult<Vec<u8>> {
        if args.is_empty() || args.len() > self.parts.len() {
            return Err(IndexError::bad_args(self.parts.len(), args.len()));
        }
        let last = args.len() - 1;
        let mut key = Vec::new();
        for (i, (part, arg)) in self.parts.iter().zip(args).enumerate() {
            let one = std::slice::from_ref(arg);
            if i == last {
                key.extend(part.prefix_from_args(one)?);
            } else {
                key.extend(part.from_args(one)?);
            }
        }
        Ok(key)
    }

    fn kind(&self) -> &'static str {
        "compound"
    }
}
