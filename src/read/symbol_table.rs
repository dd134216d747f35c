use crate::error::Error;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

/// Header of an `SNOD` block; `symbols` entries follow it.
#[derive(Clone, Debug)]
pub struct SymbolTableNode {
    pub version: u8,
    pub symbols: u16,
}

/// One member of a symbol table. The root group's entry sits right after the
/// superblock.
#[derive(Clone, Debug)]
pub struct SymbolTableEntry {
    pub link_name_offset: u64,
    pub object_header_address: u64,
    pub cache_type: u32,
    pub scratch: [u8; 16],
}

impl SymbolTableNode {
    pub fn read(input: &mut impl Read) -> Result<Self, Error> {
        let mut signature = [0; 4];
        input.read_exact(&mut signature)?;
        if &signature != b"SNOD" {
            return Err(Error::Hdf5Error(format!(
                "Wrong symbol table node signature: {:?}",
                signature
            )));
        }
        let version = input.read_u8()?;
        let _reserved = input.read_u8()?;
        Ok(SymbolTableNode {
            version,
            symbols: input.read_u16::<LittleEndian>()?,
        })
    }

    pub fn read_entries(&self, input: &mut impl Read) -> Result<Vec<SymbolTableEntry>, Error> {
        (0..self.symbols)
            .map(|_| SymbolTableEntry::read(input))
            .collect()
    }
}

impl SymbolTableEntry {
    pub fn read(input: &mut impl Read) -> Result<SymbolTableEntry, Error> {
        let link_name_offset = input.read_u64::<LittleEndian>()?;
        let object_header_address = input.read_u64::<LittleEndian>()?;
        let cache_type = input.read_u32::<LittleEndian>()?;
        let _reserved = input.read_u32::<LittleEndian>()?;
        let mut scratch = [0; 16];
        input.read_exact(&mut scratch)?;
        Ok(SymbolTableEntry {
            link_name_offset,
            object_header_address,
            cache_type,
            scratch,
        })
    }
}
