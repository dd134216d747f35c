use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::Error;
use crate::read::{
    data_object::{self, DataObject},
    group::Group,
    io::ReadSeek,
    superblock::{self, SuperBlockVersion0},
    symbol_table::SymbolTableEntry,
};

pub struct FileReader {
    pub superblock: SuperBlockVersion0,
    pub root_entry: SymbolTableEntry,
    pub data_object: DataObject,
    pub input: Box<dyn ReadSeek>,
}

impl FileReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = File::open(path.as_ref())?;
        Self::read(Box::new(BufReader::new(file)))
    }

    pub fn read(mut input: Box<dyn ReadSeek>) -> Result<Self, Error> {
        let superblock = superblock::parse_superblock(&mut input)?;
        log::debug!("{:?}", superblock);
        let root_entry = SymbolTableEntry::read(&mut input)?;
        log::debug!("{:?}", root_entry);
        let offset_to_data_objects = root_entry.object_header_address;
        let data_object = data_object::parse_data_object(&mut input, offset_to_data_objects)?;
        Ok(Self {
            superblock,
            root_entry,
            data_object,
            input,
        })
    }

    pub fn root(&self) -> Group {
        Group {
            data_object: self.data_object.clone(),
        }
    }

    pub fn group(&mut self, name: &str) -> Result<Group, Error> {
        let root = self.root();
        root.group(self, name)
    }
}
