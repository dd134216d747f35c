use crate::error::Error;
use byteorder::{LittleEndian, ReadBytesExt};
use num_enum::TryFromPrimitive;
use std::convert::TryFrom;
use std::io::{Cursor, Read};

#[repr(u8)]
#[derive(Clone, Debug, Eq, PartialEq, TryFromPrimitive)]
enum LayoutClass {
    Compact = 0,
    Contiguous = 1,
    Chunked = 2,
}

#[derive(Clone, Debug)]
pub enum DataStorage {
    Compact { data: Vec<u8> },
    Contiguous { address: u64, size: u64 },
    /// `chunk_shape` carries one extra trailing entry, the element size in bytes.
    Chunked { chunk_shape: Vec<u32>, address: u64 },
}

fn parse_compact(input: &mut impl Read) -> Result<DataStorage, Error> {
    let size = input.read_u16::<LittleEndian>()? as usize;
    let mut data = vec![0; size];
    input.read_exact(&mut data)?;
    Ok(DataStorage::Compact { data })
}

fn parse_chunked(input: &mut impl Read) -> Result<DataStorage, Error> {
    let dimensions = input.read_u8()? as usize;
    if dimensions < 2 {
        return Err(Error::Hdf5Error(format!(
            "Chunked layout needs at least one data dimension, found {}",
            dimensions
        )));
    }
    let address = input.read_u64::<LittleEndian>()?;
    let mut chunk_shape = vec![];
    for _ in 0..dimensions {
        chunk_shape.push(input.read_u32::<LittleEndian>()?);
    }
    Ok(DataStorage::Chunked {
        chunk_shape,
        address,
    })
}

fn parse_contiguous(input: &mut impl Read) -> Result<DataStorage, Error> {
    Ok(DataStorage::Contiguous {
        address: input.read_u64::<LittleEndian>()?,
        size: input.read_u64::<LittleEndian>()?,
    })
}

pub fn parse_data_storage_message(input: &mut Cursor<Vec<u8>>) -> Result<DataStorage, Error> {
    let version = input.read_u8()?;
    if version != 3 {
        return Err(Error::Hdf5Error(format!(
            "Unsupported data storage version {}",
            version
        )));
    }
    match LayoutClass::try_from(input.read_u8()?)? {
        LayoutClass::Compact => parse_compact(input),
        LayoutClass::Contiguous => parse_contiguous(input),
        LayoutClass::Chunked => parse_chunked(input),
    }
}
