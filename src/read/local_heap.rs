use std::io::SeekFrom;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::{error::Error, read::io::ReadSeek};

pub struct LocalHeap {
    pub signature: [u8; 4],
    pub version: u8,
    pub reserved: [u8; 3],
    pub data_segment_size: u64,
    pub offset_to_free_list: u64,
    pub address_of_data_segment: u64,
}

impl LocalHeap {
    pub fn read(input: &mut impl ReadSeek, address: u64) -> Result<LocalHeap, Error> {
        input.seek(SeekFrom::Start(address))?;
        let local_heap = LocalHeap {
            signature: {
                let mut result = [0; 4];
                input.read_exact(&mut result)?;
                result
            },
            version: input.read_u8()?,
            reserved: {
                let mut result = [0; 3];
                input.read_exact(&mut result)?;
                result
            },
            data_segment_size: input.read_u64::<LittleEndian>()?,
            offset_to_free_list: input.read_u64::<LittleEndian>()?,
            address_of_data_segment: input.read_u64::<LittleEndian>()?,
        };
        if &local_heap.signature != b"HEAP" || local_heap.version != 0 {
            return Err(Error::Hdf5Error(format!(
                "Wrong local heap signature {:?} or version {}",
                local_heap.signature, local_heap.version
            )));
        }
        Ok(local_heap)
    }

    /// Reads the null-terminated name stored at `offset` in the data segment.
    pub fn object_name(&self, input: &mut impl ReadSeek, offset: u64) -> Result<String, Error> {
        if offset >= self.data_segment_size {
            return Err(Error::Hdf5Error(format!(
                "Name offset {} is outside the local heap of size {}",
                offset, self.data_segment_size
            )));
        }
        input.seek(SeekFrom::Start(self.address_of_data_segment + offset))?;
        let mut result = vec![];
        loop {
            match input.read_u8()? {
                0 => break,
                byte => result.push(byte),
            }
        }
        Ok(String::from_utf8(result)?)
    }
}
