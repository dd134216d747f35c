use crate::error::Error;
use crate::padding::padded_size;
use crate::read::dataspace::{parse_dataspace_message, Dataspace};
use crate::read::datatype::{parse_datatype_message, Datatype, DatatypeEncoding};
use crate::read::io::read_block;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// An attribute as stored in its object header: name, type, shape and the raw
/// element bytes.
#[derive(Clone, Debug)]
pub struct Attribute {
    pub name: String,
    pub datatype: Datatype,
    pub dataspace: Dataspace,
    pub raw: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Integer(i64),
    Float(f64),
    String(String),
    IntegerArray(Vec<i64>),
    FloatArray(Vec<f64>),
    StringArray(Vec<String>),
}

impl AttributeValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(value) => Some(*value as f64),
            AttributeValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(value) => Some(*value),
            AttributeValue::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Scalars are promoted to a one element array.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            AttributeValue::IntegerArray(values) => {
                Some(values.iter().map(|&v| v as f64).collect())
            }
            AttributeValue::FloatArray(values) => Some(values.clone()),
            scalar => scalar.as_f64().map(|value| vec![value]),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(values: Vec<f64>) -> Self {
        AttributeValue::FloatArray(values)
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AttributeValue::Integer(value) => write!(fmt, "{}", value),
            AttributeValue::Float(value) => write!(fmt, "{}", value),
            AttributeValue::String(value) => write!(fmt, "{:?}", value),
            AttributeValue::IntegerArray(values) => write!(fmt, "{:?}", values),
            AttributeValue::FloatArray(values) => write!(fmt, "{:?}", values),
            AttributeValue::StringArray(values) => write!(fmt, "{:?}", values),
        }
    }
}

impl Attribute {
    pub fn value(&self) -> Result<AttributeValue, Error> {
        let scalar = self.dataspace.is_scalar();
        let value = match self.datatype.encoding {
            DatatypeEncoding::FixedPoint => {
                let values = self.datatype.decode_i64(&self.raw)?;
                match (scalar, values.as_slice()) {
                    (true, [value]) => AttributeValue::Integer(*value),
                    _ => AttributeValue::IntegerArray(values),
                }
            }
            DatatypeEncoding::FloatingPoint => {
                let values = self.datatype.decode_f64(&self.raw)?;
                match (scalar, values.as_slice()) {
                    (true, [value]) => AttributeValue::Float(*value),
                    _ => AttributeValue::FloatArray(values),
                }
            }
            DatatypeEncoding::String => {
                let mut values = self.datatype.decode_strings(&self.raw)?;
                if scalar && values.len() == 1 {
                    AttributeValue::String(values.remove(0))
                } else {
                    AttributeValue::StringArray(values)
                }
            }
            encoding => {
                return Err(Error::Hdf5Error(format!(
                    "Attribute '{}' has unsupported type {:?}",
                    self.name, encoding
                )))
            }
        };
        Ok(value)
    }
}

pub fn parse_attribute_message(input: &mut Cursor<Vec<u8>>) -> Result<Attribute, Error> {
    let version = input.read_u8()?;
    let _flags = input.read_u8()?;
    let name_size = input.read_u16::<LittleEndian>()? as usize;
    let datatype_size = input.read_u16::<LittleEndian>()? as usize;
    let dataspace_size = input.read_u16::<LittleEndian>()? as usize;
    // Version 1 pads each block to eight bytes, later versions store them packed.
    let stored = |size: usize| match version {
        1 => padded_size(size) as u64,
        _ => size as u64,
    };
    match version {
        1 | 2 => {}
        3 => {
            let _name_encoding = input.read_u8()?;
        }
        _ => {
            return Err(Error::Hdf5Error(format!(
                "Unsupported attribute message version {}",
                version
            )))
        }
    }

    let name = {
        let bytes = read_block(input, stored(name_size))?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8(bytes[..end].to_vec())?
    };
    let datatype = parse_datatype_message(&mut Cursor::new(read_block(
        input,
        stored(datatype_size),
    )?))?;
    let dataspace = parse_dataspace_message(&mut Cursor::new(read_block(
        input,
        stored(dataspace_size),
    )?))?;

    let data_size = dataspace
        .element_count()
        .saturating_mul(datatype.size.into());
    let raw = read_block(input, data_size)?;
    log::trace!("Attribute {} {:?} {:?}", name, datatype.encoding, dataspace.shape);

    Ok(Attribute {
        name,
        datatype,
        dataspace,
        raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(name: &str, datatype: &[u8], dataspace: &[u8], raw: &[u8]) -> Vec<u8> {
        let mut bytes = vec![1, 0];
        bytes.extend_from_slice(&(name.len() as u16 + 1).to_le_bytes());
        bytes.extend_from_slice(&(datatype.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&(dataspace.len() as u16).to_le_bytes());
        let mut name = name.as_bytes().to_vec();
        name.push(0);
        for block in [&name[..], datatype, dataspace] {
            let start = bytes.len();
            bytes.extend_from_slice(block);
            bytes.resize(start + padded_size(block.len()), 0);
        }
        bytes.extend_from_slice(raw);
        bytes
    }

    const SCALAR: [u8; 8] = [1, 0, 0, 0, 0, 0, 0, 0];

    #[test]
    fn reads_scalar_float() {
        let datatype = [0x11, 0x20, 0x3f, 0, 8, 0, 0, 0, 0, 0, 64, 0, 52, 11, 0, 52, 0xff, 3, 0, 0];
        let bytes = message("lat", &datatype, &SCALAR, &58.1056f64.to_le_bytes());
        let attribute = parse_attribute_message(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(attribute.name, "lat");
        assert_eq!(attribute.value().unwrap(), AttributeValue::Float(58.1056));
    }

    #[test]
    fn reads_scalar_string() {
        let datatype = [0x13, 0x00, 0, 0, 5, 0, 0, 0];
        let bytes = message("object", &datatype, &SCALAR, b"PVOL\0");
        let attribute = parse_attribute_message(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(attribute.value().unwrap().as_str(), Some("PVOL"));
    }

    #[test]
    fn reads_integer_array() {
        let datatype = [0x10, 0x08, 0, 0, 4, 0, 0, 0, 0, 0, 32, 0];
        let mut dataspace = vec![1, 1, 0, 0, 0, 0, 0, 0];
        dataspace.extend_from_slice(&3u64.to_le_bytes());
        let raw: Vec<u8> = [-1i32, 0, 7].iter().flat_map(|v| v.to_le_bytes()).collect();
        let bytes = message("counts", &datatype, &dataspace, &raw);
        let attribute = parse_attribute_message(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(
            attribute.value().unwrap(),
            AttributeValue::IntegerArray(vec![-1, 0, 7])
        );
    }

    #[test]
    fn rejects_values_longer_than_the_message() {
        let datatype = [0x10, 0x08, 0, 0, 4, 0, 0, 0, 0, 0, 32, 0];
        let mut dataspace = vec![1, 1, 0, 0, 0, 0, 0, 0];
        dataspace.extend_from_slice(&u64::MAX.to_le_bytes());
        let bytes = message("counts", &datatype, &dataspace, &[0; 12]);
        assert!(matches!(
            parse_attribute_message(&mut Cursor::new(bytes)),
            Err(Error::Hdf5Error(_))
        ));
    }

    #[test]
    fn promotes_scalars_to_arrays() {
        assert_eq!(AttributeValue::Integer(3).to_f64_vec(), Some(vec![3.0]));
        assert_eq!(AttributeValue::String("x".into()).to_f64_vec(), None);
        assert_eq!(AttributeValue::Float(2.0).as_i64(), Some(2));
    }
}
