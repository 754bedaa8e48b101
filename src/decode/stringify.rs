//! Value → cell text. Every field always yields some string.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt::Write;

use super::{TagMap, TagValue};
use crate::Record;
use crate::utils::config::MISSING_MARKER;

/// Canonical text for one value.
///
/// Missing → [`MISSING_MARKER`], bytes → hex, lists and maps → compact JSON, scalars → their
/// plain text. A JSON failure becomes `"error: <cause>"` for this cell only.
pub fn stringify(value: &TagValue) -> String {
    match value {
        TagValue::Missing => MISSING_MARKER.to_string(),
        TagValue::Bytes(b) => hex_string(b),
        TagValue::List(_) | TagValue::Map(_) => {
            serde_json::to_string(value).unwrap_or_else(|e| format!("error: {e}"))
        }
        TagValue::Text(s) => s.clone(),
        TagValue::Int(i) => i.to_string(),
        TagValue::Float(f) => f.to_string(),
    }
}

/// Stringify every value of a decoded map.
pub fn stringify_map(map: TagMap) -> Record {
    map.into_iter().map(|(k, v)| (k, stringify(&v))).collect()
}

/// Lowercase hex, two digits per byte.
pub fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

impl Serialize for TagValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TagValue::Missing => serializer.serialize_none(),
            TagValue::Text(s) => serializer.serialize_str(s),
            TagValue::Int(i) => serializer.serialize_i64(*i),
            TagValue::Float(f) => serializer.serialize_f64(*f),
            TagValue::Bytes(b) => serializer.serialize_str(&hex_string(b)),
            TagValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            TagValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}
