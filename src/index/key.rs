//! Order-preserving key encodings
//!
//! Every encoding sorts byte-lexicographically in the same order as the
//! values it encodes, which is what makes radix iteration ordered.

/// Terminator appended to string keys so that `"a"` never prefixes `"ab"`.
pub const STRING_TERMINATOR: u8 = 0x00;

/// Escape byte for `0x00` and itself inside string bodies. `0x00` becomes
/// `0x01 0x01` and `0x01` becomes `0x01 0x02`, so the terminator never
/// appears in a body and byte order is unchanged.
const STRING_ESCAPE: u8 = 0x01;

/// Encodes a string as its escaped UTF-8 bytes followed by the terminator.
pub fn encode_str(s: &str, lowercase: bool) -> Vec<u8> {
    let mut out = encode_str_prefix(s, lowercase);
    out.push(STRING_TERMINATOR);
    out
}

/// Encodes a string without the terminator, for prefix scans.
pub fn encode_str_prefix(s: &str, lowercase: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() + 1);
    if lowercase {
        push_escaped(&mut out, s.to_lowercase().as_bytes());
    } else {
        push_escaped(&mut out, s.as_bytes());
    }
    out
}

fn push_escaped(out: &mut Vec<u8>, bytes: &[u8]) {
    for &b in bytes {
        match b {
            STRING_TERMINATOR | STRING_ESCAPE => {
                out.push(STRING_ESCAPE);
                out.push(b + 1);
            }
            _ => out.push(b),
        }
    }
}

/// Big-endian with the sign bit flipped, so negatives sort first.
pub fn encode_int(v: i64) -> [u8; 8] {
    ((v as u64) ^ (1 << 63)).to_be_bytes()
}

pub fn encode_uint(v: u64) -> [u8; 8] {
    v.to_be_bytes()
}

pub fn encode_bool(v: bool) -> [u8; 1] {
    [v as u8]
}

/// Total-order encoding of a float.
pub fn encode_float(v: f64) -> [u8; 8] {
    let bits = v.to_bits();
    let ordered = if (bits >> 63) == 1 {
        !bits // Negative: flip all bits
    } else {
        bits ^ (1 << 63) // Positive: flip sign bit
    };
    ordered.to_be_bytes()
}

/// A scalar JSON value used as an index key.
///
/// Ordering is deterministic: Bool < Int < Float < String.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexKey {
    /// Boolean value (false < true)
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// String value
    String(String),
}

impl IndexKey {
    const TAG_BOOL: u8 = 0x01;
    const TAG_INT: u8 = 0x02;
    const TAG_FLOAT: u8 = 0x03;
    const TAG_STRING: u8 = 0x04;

    /// Create a key from a JSON value
    ///
    /// Arrays, objects and null are not keys.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(IndexKey::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(IndexKey::Int(i))
                } else {
                    n.as_f64().map(IndexKey::Float)
                }
            }
            serde_json::Value::String(s) => Some(IndexKey::String(s.clone())),
            _ => None,
        }
    }

    /// Tagged encoding of the full key.
    pub fn encode(&self, lowercase: bool) -> Vec<u8> {
        let mut out = self.encode_prefix(lowercase);
        if let IndexKey::String(_) = self {
            out.push(STRING_TERMINATOR);
        }
        out
    }

    /// Like `encode`, without the string terminator.
    pub fn encode_prefix(&self, lowercase: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(9);
        match self {
            IndexKey::Bool(b) => {
                out.push(Self::TAG_BOOL);
                out.extend_from_slice(&encode_bool(*b));
            }
            IndexKey::Int(i) => {
                out.push(Self::TAG_INT);
                out.extend_from_slice(&encode_int(*i));
            }
            IndexKey::Float(f) => {
                out.push(Self::TAG_FLOAT);
                out.extend_from_slice(&encode_float(*f));
            }
            IndexKey::String(s) => {
                out.push(Self::TAG_STRING);
                out.extend_from_slice(&encode_str_prefix(s, lowercase));
            }
        }
        out
    }
}
