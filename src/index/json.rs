//! Indexer for `serde_json::Value` records
//!
//! Used by the schema loader, where tables are declared in a JSON file and
//! records are plain JSON documents.

use serde_json::Value;

use super::errors::{IndexError, IndexResult};
use super::indexer::{single_arg, IndexArg, Indexer};
use super::key::IndexKey;

/// Indexes the scalar found at a dot-separated path.
///
/// Scalars are encoded with a type tag, so a single index may hold mixed
/// types. With `multi`, an array at the path yields one key per element.
#[derive(Debug, Clone)]
pub struct JsonFieldIndex {
    path: Vec<String>,
    multi: bool,
    lowercase: bool,
}

impl JsonFieldIndex {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.split('.').map(str::to_string).collect(),
            multi: false,
            lowercase: false,
        }
    }

    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    /// The path joined back with dots.
    pub fn path(&self) -> String {
        self.path.join(".")
    }

    fn lookup<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        self.path
            .iter()
            .try_fold(record, |value, segment| value.get(segment.as_str()))
    }

    fn encode(&self, value: &Value) -> IndexResult<Option<Vec<u8>>> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            _ => match IndexKey::from_json(value) {
                Some(key) => Ok(Some(key.encode(self.lowercase))),
                None => Err(IndexError::unsupported_value(format!(
                    "value at '{}' is not a scalar",
                    self.path()
                ))),
            },
        }
    }

    fn arg_key(arg: &IndexArg) -> IndexResult<IndexKey> {
        match arg {
            IndexArg::Str(s) => Ok(IndexKey::String(s.clone())),
            IndexArg::Int(i) => Ok(IndexKey::Int(*i)),
            IndexArg::Uint(u) => i64::try_from(*u)
                .map(IndexKey::Int)
                .map_err(|_| IndexError::unsupported_value(format!("{} overflows int", u))),
            IndexArg::Float(f) => Ok(IndexKey::Float(*f)),
            IndexArg::Bool(b) => Ok(IndexKey::Bool(*b)),
            IndexArg::Bytes(_) => Err(IndexError::type_mismatch("scalar", "bytes")),
        }
    }
}

impl Indexer<Value> for JsonFieldIndex {
    fn from_object(&self, record: &Value) -> IndexResult<Vec<Vec<u8>>> {
        let value = match self.lookup(record) {
            Some(value) => value,
            None => return Ok(Vec::new()),
        };

        match value {
            Value::Array(items) if self.multi => {
                let mut keys = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(key) = self.encode(item)? {
                        keys.push(key);
                    }
                }
                keys.sort();
                keys.dedup();
                Ok(keys)
            }
            _ => Ok(self.encode(value)?.into_iter().collect()),
        }
    }

    fn from_args(&self, args: &[IndexArg]) -> IndexResult<Vec<u8>> {
        let key = Self::arg_key(single_arg(args)?)?;
        Ok(key.encode(self.lowercase))
    }

    fn prefix_from_args(&self, args: &[IndexArg]) -> IndexResult<Vec<u8>> {
        let key = Self::arg_key(single_arg(args)?)?;
        Ok(key.encode_prefix(self.lowercase))
    }

    fn is_multi(&self) -> bool {
        self.multi
    }

    fn kind(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_path() {
        let index = JsonFieldIndex::new("meta.owner");
        let record = json!({"id": "1", "meta": {"owner": "ops"}});
        let keys = index.from_object(&record).unwrap();
        assert_eq!(keys, vec![b"\x04ops\x00".to_vec()]);
        assert_eq!(index.from_args(&["ops".into()]).unwrap(), keys[0]);
    }

    #[test]
    fn test_missing_and_null() {
        let index = JsonFieldIndex::new("name");
        assert!(index.from_object(&json!({})).unwrap().is_empty());
        assert!(index.from_object(&json!({"name": null})).unwrap().is_empty());
        assert!(index.from_object(&json!({"name": ""})).unwrap().is_empty());
    }

    #[test]
    fn test_non_scalar_rejected() {
        let index = JsonFieldIndex::new("name");
        assert!(index.from_object(&json!({"name": {"a": 1}})).is_err());
        assert!(index.from_object(&json!({"name": [1, 2]})).is_err());
    }

    #[test]
    fn test_multi_array() {
        let index = JsonFieldIndex::new("tags").multi();
        let keys = index.from_object(&json!({"tags": ["b", "a", "b"]})).unwrap();
        assert_eq!(keys, vec![b"\x04a\x00".to_vec(), b"\x04b\x00".to_vec()]);

        // A lone scalar still works
        let keys = index.from_object(&json!({"tags": "x"})).unwrap();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_int_args() {
        let index = JsonFieldIndex::new("port");
        let keys = index.from_object(&json!({"port": 80})).unwrap();
        assert_eq!(index.from_args(&[IndexArg::Int(80)]).unwrap(), keys[0]);
        assert_eq!(index.from_args(&[IndexArg::Uint(80)]).unwrap(), keys[0]);
    }

    #[test]
    fn test_prefix_and_lowercase() {
        let index = JsonFieldIndex::new("name").lowercase();
        assert_eq!(index.prefix_from_args(&["AB".into()]).unwrap(), b"\x04ab".to_vec());
        let keys = index.from_object(&json!({"name": "ABC"})).unwrap();
        assert!(keys[0].starts_with(b"\x04ab"));
    }
}
