use crate::{error::Error, padding::padded_size};
use byteorder::{LittleEndian, ReadBytesExt};
use num_enum::TryFromPrimitive;
use std::convert::TryFrom;
use std::io::{Cursor, Read};

#[repr(u16)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive)]
pub enum FilterType {
    ReservedFilter = 0,
    GzipDeflateFilter = 1,
    ShuffleFilter = 2,
    Fletch32Filter = 3,
    SzipFilter = 4,
    NbitFilter = 5,
    ScaleoffsetFilter = 6,
}

#[derive(Clone, Debug)]
pub struct FilterPipeline {
    pub filter_type: FilterType,
    pub name: String,
    pub optional: bool,
    pub client_data: Vec<u32>,
}

pub fn parse_filter_pipeline_message(
    input: &mut Cursor<Vec<u8>>,
) -> Result<Vec<FilterPipeline>, Error> {
    let version = input.read_u8()?;
    let filter_count = input.read_u8()? as usize;
    match version {
        1 => {
            let _reserved_0 = input.read_u16::<LittleEndian>()?;
            let _reserved_1 = input.read_u32::<LittleEndian>()?;
        }
        2 => {}
        _ => {
            return Err(Error::Hdf5Error(format!(
                "Unsupported filter pipeline version: {}",
                version
            )));
        }
    }
    let mut filters = vec![];
    for _ in 0..filter_count {
        let filter_id = input.read_u16::<LittleEndian>()?;
        let filter_type = FilterType::try_from(filter_id)?;
        // Version 2 drops the name for predefined filters (ids below 256).
        let name_length = if version == 1 || filter_id >= 256 {
            input.read_u16::<LittleEndian>()? as usize
        } else {
            0
        };
        let flags = input.read_u16::<LittleEndian>()?;
        let client_data_value_count = input.read_u16::<LittleEndian>()?;

        let name = if name_length > 0 {
            let stored_length = if version == 1 {
                padded_size(name_length)
            } else {
                name_length
            };
            let mut name_bytes = vec![0; stored_length];
            input.read_exact(&mut name_bytes)?;
            let end = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_length);
            String::from_utf8(name_bytes[..end].to_vec())?
        } else {
            String::new()
        };

        let mut client_data = vec![];
        for _ in 0..client_data_value_count {
            client_data.push(input.read_u32::<LittleEndian>()?);
        }
        if version == 1 && client_data_value_count % 2 == 1 {
            let _padding = input.read_u32::<LittleEndian>()?;
        }
        filters.push(FilterPipeline {
            filter_type,
            name,
            optional: flags & 0x0001 != 0,
            client_data,
        });
    }

    Ok(filters)
}

/// Reverses the byte shuffle: the stored buffer holds every element's first
/// byte, then every element's second byte, and so on.
pub fn unshuffle(buffer: &[u8], item_size: usize) -> Vec<u8> {
    if item_size <= 1 {
        return buffer.to_vec();
    }
    let item_count = buffer.len() / item_size;
    let mut unshuffled = buffer.to_vec();
    for item_index in 0..item_count {
        for byte_index in 0..item_size {
            unshuffled[item_index * item_size + byte_index] =
                buffer[byte_index * item_count + item_index];
        }
    }
    unshuffled
}
