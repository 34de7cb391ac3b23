//! Object definitions (`.ob`)
//!
//! A count and a string table offset, followed by variable-sized records.
//! Every record names its object and lists `key=value` property strings,
//! all stored as offsets into the string table.

use std::path::Path;

use glam::Vec3;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::utils::ByteReader;

/// Record size without a property array.
const BASE_RECORD_SIZE: usize = 20;

/// One placed object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectDef {
    pub name: String,
    pub unknown06: i16,
    pub position: Vec3,
    /// `key=value` strings in file order.
    pub properties: Vec<String>,
}

impl ObjectDef {
    /// Value of the first property named `name`.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.iter().find_map(|prop| {
            let (key, value) = prop.split_once('=')?;
            (key == name).then_some(value)
        })
    }
}

/// Decode an object definition file.
pub fn decode_objects(data: &[u8]) -> Result<Vec<ObjectDef>> {
    let mut reader = ByteReader::new(data);
    let count = reader.read_i16()?;
    let count = usize::try_from(count).map_err(|_| Error::InvalidHeader {
        format: "object",
        message: format!("negative object count {count}"),
    })?;
    reader.skip(2);
    let string_offset = reader.read_i32()?;

    let string = |reader: &ByteReader<'_>, delta: i32| -> Result<String> {
        let at = reader.resolve_offset(0, string_offset.wrapping_add(delta), "object string")?;
        reader.zstring_at(at)
    };

    let mut objects = Vec::new();
    for _ in 0..count {
        let name_delta = reader.read_i32()?;
        let name = string(&reader, name_delta)?;
        let struct_size = usize::try_from(reader.read_i16()?).unwrap_or(0);
        let unknown06 = reader.read_i16()?;
        let position = Vec3::new(reader.read_f32()?, reader.read_f32()?, reader.read_f32()?);

        let slots = struct_size.saturating_sub(BASE_RECORD_SIZE) / 4;
        let mut properties = Vec::new();
        for slot in 0..slots {
            let delta = reader.read_i32()?;
            // The array ends with a null entry.
            if delta == 0 && slot == slots - 1 {
                break;
            }
            properties.push(string(&reader, delta)?);
        }

        objects.push(ObjectDef {
            name,
            unknown06,
            position,
            properties,
        });
    }
    tracing::debug!("decoded {} object definitions", objects.len());
    Ok(objects)
}

pub fn read_objects<P: AsRef<Path>>(path: P) -> Result<Vec<ObjectDef>> {
    decode_objects(&std::fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(out: &mut Vec<u8>, name: i32, position: [f32; 3], props: &[i32]) {
        out.extend_from_slice(&name.to_le_bytes());
        out.extend_from_slice(&((BASE_RECORD_SIZE + props.len() * 4) as i16).to_le_bytes());
        out.extend_from_slice(&7i16.to_le_bytes());
        for p in position {
            out.extend_from_slice(&p.to_le_bytes());
        }
        for p in props {
            out.extend_from_slice(&p.to_le_bytes());
        }
    }

    fn build_file() -> Vec<u8> {
        let strings = b"chest\0lock=3\0gold=120\0torch\0";
        let mut data = Vec::new();
        data.extend_from_slice(&2i16.to_le_bytes());
        data.extend_from_slice(&0i16.to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());
        record(&mut data, 0, [1.0, 2.0, 3.0], &[6, 13, 0]);
        record(&mut data, 22, [0.0, -4.0, 0.5], &[]);

        let table = data.len() as i32;
        data[4..8].copy_from_slice(&table.to_le_bytes());
        data.extend_from_slice(strings);
        data
    }

    #[test]
    fn test_decode_objects() {
        let objects = decode_objects(&build_file()).unwrap();
        assert_eq!(objects.len(), 2);

        assert_eq!(objects[0].name, "chest");
        assert_eq!(objects[0].unknown06, 7);
        assert_eq!(objects[0].position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(objects[0].properties, vec!["lock=3", "gold=120"]);
        assert_eq!(objects[0].property("gold"), Some("120"));
        assert_eq!(objects[0].property("gol"), None);

        assert_eq!(objects[1].name, "torch");
        assert!(objects[1].properties.is_empty());
    }

    #[test]
    fn test_count_past_end_of_file() {
        let mut data = build_file();
        data[0..2].copy_from_slice(&i16::MAX.to_le_bytes());
        assert!(matches!(
            decode_objects(&data),
            Err(Error::UnexpectedEof { .. } | Error::OffsetOutOfRange { .. })
        ));

        data[0..2].copy_from_slice(&(-1i16).to_le_bytes());
        assert!(matches!(
            decode_objects(&data),
            Err(Error::InvalidHeader { format: "object", .. })
        ));
    }

    #[test]
    fn test_string_offset_out_of_range() {
        let mut data = build_file();
        data[8..12].copy_from_slice(&0x1000i32.to_le_bytes());
        assert!(matches!(decode_objects(&data), Err(Error::OffsetOutOfRange { .. })));
    }
}
