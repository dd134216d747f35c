use crate::error::Error;
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use num_enum::TryFromPrimitive;
use std::convert::TryFrom;
use std::io::Read;

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive)]
pub enum DatatypeEncoding {
    FixedPoint = 0,
    FloatingPoint = 1,
    Time = 2,
    String = 3,
    Bitfield = 4,
    Opaque = 5,
    Compound = 6,
    Reference = 7,
    Enumerated = 8,
    VariableLength = 9,
    Array = 10,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Endianness {
    Little,
    Big,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive)]
pub enum StringPadding {
    NullTerminate = 0,
    NullPad = 1,
    SpacePad = 2,
}

#[derive(Clone, Debug)]
pub struct Datatype {
    pub class_and_version: u8,
    pub class_bit_field_0: u8,
    pub class_bit_field_1: u8,
    pub class_bit_field_2: u8,
    pub size: u32,
    pub encoding: DatatypeEncoding,
}

pub fn parse_datatype_message(input: &mut impl Read) -> Result<Datatype, Error> {
    let class_and_version = input.read_u8()?;
    let datatype = Datatype {
        class_and_version,
        class_bit_field_0: input.read_u8()?,
        class_bit_field_1: input.read_u8()?,
        class_bit_field_2: input.read_u8()?,
        size: input.read_u32::<LittleEndian>()?,
        encoding: DatatypeEncoding::try_from(class_and_version & 0x0F)?,
    };

    // Class properties (bit offsets, exponent layout) follow here. Decoding only
    // needs the class bit fields and the size, and every caller hands us a cursor
    // bounded to this message, so the properties are left unread.
    Ok(datatype)
}

impl Datatype {
    pub fn endianness(&self) -> Endianness {
        if self.class_bit_field_0 & 0x01 == 0 {
            Endianness::Little
        } else {
            Endianness::Big
        }
    }

    /// Only meaningful for fixed-point types.
    pub fn is_signed(&self) -> bool {
        self.class_bit_field_0 & 0x08 != 0
    }

    pub fn string_padding(&self) -> Result<StringPadding, Error> {
        Ok(StringPadding::try_from(self.class_bit_field_0 & 0x0F)?)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.encoding,
            DatatypeEncoding::FixedPoint | DatatypeEncoding::FloatingPoint
        )
    }

    /// Widens every element of `raw` to `f64`.
    pub fn decode_f64(&self, raw: &[u8]) -> Result<Vec<f64>, Error> {
        match self.endianness() {
            Endianness::Little => self.decode_f64_with::<LittleEndian>(raw),
            Endianness::Big => self.decode_f64_with::<BigEndian>(raw),
        }
    }

    fn decode_f64_with<B: ByteOrder>(&self, raw: &[u8]) -> Result<Vec<f64>, Error> {
        let size = self.size as usize;
        if size == 0 || raw.len() % size != 0 {
            return Err(Error::Hdf5Error(format!(
                "Buffer of {} bytes is not a whole number of {} byte elements",
                raw.len(),
                size
            )));
        }
        let decode: fn(&[u8]) -> f64 = match (self.encoding, size, self.is_signed()) {
            (DatatypeEncoding::FloatingPoint, 4, _) => |b| B::read_f32(b) as f64,
            (DatatypeEncoding::FloatingPoint, 8, _) => B::read_f64,
            (DatatypeEncoding::FixedPoint, 1, false) => |b| b[0] as f64,
            (DatatypeEncoding::FixedPoint, 1, true) => |b| b[0] as i8 as f64,
            (DatatypeEncoding::FixedPoint, 2, false) => |b| B::read_u16(b) as f64,
            (DatatypeEncoding::FixedPoint, 2, true) => |b| B::read_i16(b) as f64,
            (DatatypeEncoding::FixedPoint, 4, false) => |b| B::read_u32(b) as f64,
            (DatatypeEncoding::FixedPoint, 4, true) => |b| B::read_i32(b) as f64,
            (DatatypeEncoding::FixedPoint, 8, false) => |b| B::read_u64(b) as f64,
            (DatatypeEncoding::FixedPoint, 8, true) => |b| B::read_i64(b) as f64,
            _ => {
                return Err(Error::Hdf5Error(format!(
                    "Cannot decode {:?} of size {} as a number",
                    self.encoding, size
                )))
            }
        };
        Ok(raw.chunks_exact(size).map(decode).collect())
    }

    /// Decodes fixed-point elements without going through `f64`, so 64 bit
    /// values keep their precision.
    pub fn decode_i64(&self, raw: &[u8]) -> Result<Vec<i64>, Error> {
        if self.encoding != DatatypeEncoding::FixedPoint {
            return Err(Error::Hdf5Error(format!(
                "Cannot decode {:?} as an integer",
                self.encoding
            )));
        }
        let size = self.size as usize;
        if !matches!(size, 1 | 2 | 4 | 8) || raw.len() % size != 0 {
            return Err(Error::Hdf5Error(format!(
                "Cannot decode {} bytes as integers of size {}",
                raw.len(),
                size
            )));
        }
        let signed = self.is_signed();
        let values = raw
            .chunks_exact(size)
            .map(|bytes| match self.endianness() {
                Endianness::Little if signed => LittleEndian::read_int(bytes, size),
                Endianness::Little => LittleEndian::read_uint(bytes, size) as i64,
                Endianness::Big if signed => BigEndian::read_int(bytes, size),
                Endianness::Big => BigEndian::read_uint(bytes, size) as i64,
            })
            .collect();
        Ok(values)
    }

    /// Decodes fixed-length strings. The character set bits are ignored in
    /// favour of trying UTF-8 first and falling back to Latin-1.
    pub fn decode_strings(&self, raw: &[u8]) -> Result<Vec<String>, Error> {
        if self.encoding != DatatypeEncoding::String {
            return Err(Error::Hdf5Error(format!(
                "Cannot decode {:?} as a string",
                self.encoding
            )));
        }
        let size = self.size as usize;
        if size == 0 {
            return Ok(vec![]);
        }
        let padding = self.string_padding()?;
        Ok(raw
            .chunks(size)
            .map(|bytes| {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                let mut bytes = &bytes[..end];
                if padding == StringPadding::SpacePad {
                    while let Some((&b' ', rest)) = bytes.split_last() {
                        bytes = rest;
                    }
                }
                match std::str::from_utf8(bytes) {
                    Ok(text) => text.to_string(),
                    Err(_) => bytes.iter().map(|&b| b as char).collect(),
                }
            })
            .collect())
    }
}
