//! Default decoder: DICOM metadata via the `dicom-object` crate.
//!
//! Reads each file up to, not including, Pixel Data. Nested sequences are flattened with an
//! explicit stack of `(prefix, dataset)` pairs instead of recursion, so depth is bounded only by
//! memory. Keys look like `Modality (0008, 0060)`; an element inside a sequence item gets the
//! sequence key plus `" - "` as prefix.

use dicom_core::dictionary::{DataDictionary, DataDictionaryEntry};
use dicom_core::{DicomValue, PrimitiveValue, Tag};
use dicom_dictionary_std::{StandardDataDictionary, tags};
use dicom_object::{InMemDicomObject, OpenFileOptions};
use log::trace;
use std::path::Path;

use super::{DecodeError, Decoder, TagMap, TagValue};

/// Used when the dictionary has no alias for a tag (private tags).
const UNKNOWN_ALIAS: &str = "Unknown";

/// Decoder backed by `dicom-object`. Stateless; share one instance across threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct DicomDecoder;

impl Decoder for DicomDecoder {
    fn decode(&self, path: &Path) -> Result<TagMap, DecodeError> {
        if let Err(source) = std::fs::metadata(path) {
            return Err(DecodeError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
        let obj = OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(path)
            .map_err(|e| DecodeError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(flatten_dataset(&obj))
    }
}

/// Overlay groups (0x60xx, even) and pixel/signature/padding groups carry bulk data, not metadata.
pub fn is_skipped_group(group: u16) -> bool {
    let overlay = group >> 8 == 0x60 && (group & 0xFF) % 2 == 0;
    overlay || matches!(group, 0x7FE0 | 0xFFFA | 0xFFFC | 0xFFFE)
}

/// `Alias (GGGG, EEEE)` for one tag, the header layout existing sheets already use.
fn tag_key(dict: &StandardDataDictionary, tag: Tag) -> String {
    let alias = dict
        .by_tag(tag)
        .map(|entry| entry.alias())
        .unwrap_or(UNKNOWN_ALIAS);
    format!("{alias} ({:04X}, {:04X})", tag.group(), tag.element())
}

fn flatten_dataset(root: &InMemDicomObject) -> TagMap {
    let dict = StandardDataDictionary;
    let mut out = TagMap::new();
    let mut stack: Vec<(String, &InMemDicomObject)> = vec![(String::new(), root)];

    while let Some((prefix, dataset)) = stack.pop() {
        let mut nested = Vec::new();
        for elem in dataset.iter() {
            let tag = elem.header().tag;
            match elem.value() {
                DicomValue::Sequence(seq) => {
                    let child_prefix = format!("{prefix}{} - ", tag_key(&dict, tag));
                    for item in seq.items() {
                        nested.push((child_prefix.clone(), item));
                    }
                }
                DicomValue::Primitive(value) => {
                    if is_skipped_group(tag.group()) {
                        continue;
                    }
                    let key = format!("{prefix}{}", tag_key(&dict, tag));
                    out.insert(key, primitive_to_value(value));
                }
                _ => trace!("skipping encapsulated pixel data at {tag}"),
            }
        }
        // Reverse so items pop in file order; a later item wins on a key collision.
        stack.extend(nested.into_iter().rev());
    }
    out
}

fn primitive_to_value(value: &PrimitiveValue) -> TagValue {
    if let PrimitiveValue::Empty = value {
        return TagValue::Missing;
    }
    if let PrimitiveValue::U8(bytes) = value {
        return TagValue::Bytes(bytes.to_vec());
    }
    if value.multiplicity() > 1 {
        return TagValue::List(
            value
                .to_multi_str()
                .iter()
                .map(|s| TagValue::Text(s.trim_end_matches([' ', '\0']).to_string()))
                .collect(),
        );
    }
    let single = match value {
        PrimitiveValue::I16(v) => v.first().map(|x| TagValue::Int(i64::from(*x))),
        PrimitiveValue::U16(v) => v.first().map(|x| TagValue::Int(i64::from(*x))),
        PrimitiveValue::I32(v) => v.first().map(|x| TagValue::Int(i64::from(*x))),
        PrimitiveValue::U32(v) => v.first().map(|x| TagValue::Int(i64::from(*x))),
        PrimitiveValue::I64(v) => v.first().map(|x| TagValue::Int(*x)),
        PrimitiveValue::F32(v) => v.first().map(|x| TagValue::Float(f64::from(*x))),
        PrimitiveValue::F64(v) => v.first().map(|x| TagValue::Float(*x)),
        _ => None,
    };
    single.unwrap_or_else(|| TagValue::Text(value.to_str().trim_end_matches([' ', '\0']).to_string()))
}
