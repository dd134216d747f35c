use crate::read::attribute::{parse_attribute_message, Attribute, AttributeValue};
use crate::read::data_storage::{parse_data_storage_message, DataStorage};
use crate::read::dataspace::{parse_dataspace_message, Dataspace};
use crate::read::datatype::{parse_datatype_message, Datatype};
use crate::read::filter_pipeline::{parse_filter_pipeline_message, FilterPipeline};
use crate::read::io::{read_block, ReadSeek};
use crate::read::link::{parse_link_message, parse_symbol_table_message};
use crate::{
    error::Error,
    read::link::Link,
    read::message::{MessageHeaderV1, MessageHeaderV2, MessageType},
};
use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    io::{Cursor, Read, Seek, SeekFrom},
};

bitflags! {
    struct ObjectHeaderFlags: u8 {
        const SIZE_OF_CHUNK_BIT_A = 0b000001;
        const SIZE_OF_CHUNK_BIT_B = 0b000010;
        const ATTRIBUTE_CREATION_ORDER_TRACKED = 0b000100;
        const ATTRIBUTE_CREATION_ORDER_INDEXED = 0b001000;
        const NON_DEFAULT_ATTRIBUTE_STORAGE_PHASE_CHANGE = 0b010000;
        const ACCESS_MODIFICATION_CHANGE_AND_BIRTH_TRACKED = 0b100000;
    }
}

/// Message flag marking a message stored in the shared object header message heap.
const MESSAGE_SHARED: u8 = 0b0000_0010;

#[derive(Clone, Debug)]
struct ObjectHeaderV1 {
    version: u8,
    reserved: u8,
    total_header_messages: u16,
    object_reference_count: u32,
    object_header_size: u32,
    padding: u32,
}

#[derive(Clone, Debug)]
struct ObjectHeaderV2 {
    signature: [u8; 4],
    version: u8,
    flags: ObjectHeaderFlags,
    size_of_chunk_0: u64,
}

#[derive(Clone, Debug, Default)]
pub struct DataObject {
    pub links: HashMap<String, Link>,
    pub attributes: Vec<Attribute>,
    pub data: Vec<DataStorage>,
    pub datatypes: Vec<Datatype>,
    pub dataspaces: Vec<Dataspace>,
    pub filter_pipelines: Vec<FilterPipeline>,
}

impl DataObject {
    /// Objects carrying a data layout message are datasets, everything else is
    /// treated as a group.
    pub fn is_dataset(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn is_group(&self) -> bool {
        !self.is_dataset()
    }

    /// Decoded attribute values by name. Attributes of unsupported types are
    /// logged and left out.
    pub fn attribute_values(&self) -> BTreeMap<String, AttributeValue> {
        self.attributes
            .iter()
            .filter_map(|attribute| match attribute.value() {
                Ok(value) => Some((attribute.name.clone(), value)),
                Err(err) => {
                    log::warn!("Skipping attribute '{}': {}", attribute.name, err);
                    None
                }
            })
            .collect()
    }
}

/// Which object header format a continuation block belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum HeaderVersion {
    V1,
    V2,
}

/// Chunks of one object header, with the addresses already read so that a
/// continuation pointing back into the header is caught instead of followed.
struct HeaderChunks {
    chunks: Vec<Vec<u8>>,
    visited: HashSet<u64>,
}

impl HeaderChunks {
    fn read_first(input: &mut impl ReadSeek, size: u64) -> Result<Self, Error> {
        let address = input.stream_position()?;
        Ok(HeaderChunks {
            chunks: vec![read_block(input, size)?],
            visited: HashSet::from([address]),
        })
    }
}

fn read_continuation(
    input: &mut impl ReadSeek,
    message: &mut Cursor<Vec<u8>>,
    header_version: HeaderVersion,
    header_chunks: &mut HeaderChunks,
) -> Result<(), Error> {
    let offset = message.read_u64::<LittleEndian>()?;
    let size = message.read_u64::<LittleEndian>()?;
    log::trace!("Continuation at {} of {} bytes", offset, size);
    if !header_chunks.visited.insert(offset) {
        return Err(Error::Hdf5Error(format!(
            "Object header continuation at {} was already read",
            offset
        )));
    }
    input.seek(SeekFrom::Start(offset))?;
    let continuation_chunk = match header_version {
        HeaderVersion::V1 => read_block(input, size)?,
        HeaderVersion::V2 => {
            let mut chunk_signature = [0; 4];
            input.read_exact(&mut chunk_signature)?;
            if &chunk_signature != b"OCHK" || size < 4 {
                return Err(Error::Hdf5Error(format!(
                    "Unexpected chunk signature {:?}",
                    &chunk_signature
                )));
            }
            read_block(input, size - 4)?
        }
    };
    header_chunks.chunks.push(continuation_chunk);
    Ok(())
}

fn parse_message(
    input: &mut impl ReadSeek,
    current_message_data: Vec<u8>,
    message_type: MessageType,
    message_flags: u8,
    header_version: HeaderVersion,
    data_object: &mut DataObject,
    header_chunks: &mut HeaderChunks,
) -> Result<(), Error> {
    let mut current_message_cursor = Cursor::new(current_message_data);

    if message_flags & MESSAGE_SHARED != 0 {
        log::warn!("Skipping shared {:?} message", message_type);
        return Ok(());
    }

    match message_type {
        MessageType::Continuation => {
            read_continuation(
                input,
                &mut current_message_cursor,
                header_version,
                header_chunks,
            )?;
        }
        MessageType::Link => {
            let link = parse_link_message(&mut current_message_cursor)?;
            data_object.links.insert(link.name.clone(), link);
        }
        MessageType::Attribute => {
            data_object
                .attributes
                .push(parse_attribute_message(&mut current_message_cursor)?);
        }
        MessageType::DataLayout => {
            data_object
                .data
                .push(parse_data_storage_message(&mut current_message_cursor)?);
        }
        MessageType::Datatype => {
            data_object
                .datatypes
                .push(parse_datatype_message(&mut current_message_cursor)?);
        }
        MessageType::Dataspace => {
            data_object
                .dataspaces
                .push(parse_dataspace_message(&mut current_message_cursor)?);
        }
        MessageType::FilterPipeline => {
            data_object
                .filter_pipelines
                .extend(parse_filter_pipeline_message(&mut current_message_cursor)?);
        }
        MessageType::SymbolTable => {
            let links = parse_symbol_table_message(input, &mut current_message_cursor)?;
            data_object
                .links
                .extend(links.into_iter().map(|l| (l.name.clone(), l)));
        }
        MessageType::LinkInfo | MessageType::AttributeInfo => {
            // Dense link and attribute storage lives in a fractal heap. Objects
            // that only use compact storage carry an empty info message.
            log::debug!("Ignoring {:?} message", message_type);
        }
        _ => {
            log::trace!("Skipping {:?} message", message_type);
        }
    }
    Ok(())
}

fn parse_v1_objects(version_hint: u8, input: &mut impl ReadSeek) -> Result<DataObject, Error> {
    let object_header = ObjectHeaderV1 {
        version: version_hint,
        reserved: input.read_u8()?,
        total_header_messages: input.read_u16::<LittleEndian>()?,
        object_reference_count: input.read_u32::<LittleEndian>()?,
        object_header_size: input.read_u32::<LittleEndian>()?,
        padding: input.read_u32::<LittleEndian>()?,
    };

    log::trace!("{:?}", object_header);

    let mut header_chunks =
        HeaderChunks::read_first(input, object_header.object_header_size.into())?;
    let mut data_object = DataObject::default();
    let mut messages_read = 0;
    let mut current_chunk_index = 0;
    let header_size = 8;
    while current_chunk_index < header_chunks.chunks.len() {
        let current_chunk = header_chunks.chunks[current_chunk_index].clone();
        let current_chunk_len = current_chunk.len() as u64;
        let mut data_cursor = Cursor::new(current_chunk);
        // The message count covers all chunks, continuation blocks included.
        while messages_read < object_header.total_header_messages
            && data_cursor.position() + header_size <= current_chunk_len
        {
            let raw_message_type = data_cursor.read_u16::<LittleEndian>()?;
            let message_header = MessageHeaderV1 {
                message_type: MessageType::from_raw(raw_message_type),
                size: data_cursor.read_u16::<LittleEndian>()?,
                flags: data_cursor.read_u8()?,
                reserved: {
                    let mut result = [0; 3];
                    data_cursor.read_exact(&mut result)?;
                    result
                },
            };
            log::trace!("{:?}", message_header);
            messages_read += 1;

            let current_message_data = {
                let mut result = vec![0; message_header.size as usize];
                data_cursor.read_exact(&mut result)?;
                result
            };

            parse_message(
                input,
                current_message_data,
                message_header.message_type,
                message_header.flags,
                HeaderVersion::V1,
                &mut data_object,
                &mut header_chunks,
            )?;
        }
        current_chunk_index += 1;
    }

    Ok(data_object)
}

fn parse_v2_objects(version_hint: u8, input: &mut impl ReadSeek) -> Result<DataObject, Error> {
    let object_header = {
        let signature = [
            version_hint,
            input.read_u8()?,
            input.read_u8()?,
            input.read_u8()?,
        ];
        if &signature != b"OHDR" {
            return Err(Error::Hdf5Error(format!(
                "Unexpected object header signature {:?}",
                signature
            )));
        }
        let version = input.read_u8()?;
        let flags = ObjectHeaderFlags::from_bits_truncate(input.read_u8()?);

        if version != 2 {
            return Err(Error::Hdf5Error(format!(
                "Unsupported data object header version found: {}",
                version
            )));
        }

        if flags.contains(ObjectHeaderFlags::ACCESS_MODIFICATION_CHANGE_AND_BIRTH_TRACKED) {
            input.seek(SeekFrom::Current(16))?;
        }
        if flags.contains(ObjectHeaderFlags::NON_DEFAULT_ATTRIBUTE_STORAGE_PHASE_CHANGE) {
            let _max_compact_attributes = input.read_u16::<LittleEndian>()?;
            let _min_dense_attributes = input.read_u16::<LittleEndian>()?;
        }

        let size_of_chunk_field_bits_value = (flags
            & (ObjectHeaderFlags::SIZE_OF_CHUNK_BIT_A | ObjectHeaderFlags::SIZE_OF_CHUNK_BIT_B))
            .bits();
        let size_of_chunk_0 = match size_of_chunk_field_bits_value {
            0 => input.read_u8()? as u64,
            1 => input.read_u16::<LittleEndian>()? as u64,
            2 => input.read_u32::<LittleEndian>()? as u64,
            _ => input.read_u64::<LittleEndian>()?,
        };
        ObjectHeaderV2 {
            signature,
            version,
            flags,
            size_of_chunk_0,
        }
    };

    log::trace!("{:?}", object_header);

    let mut header_chunks = HeaderChunks::read_first(input, object_header.size_of_chunk_0)?;

    let mut data_object = DataObject::default();
    let mut current_chunk_index = 0;
    let header_size = if object_header
        .flags
        .contains(ObjectHeaderFlags::ATTRIBUTE_CREATION_ORDER_TRACKED)
    {
        6
    } else {
        4
    };
    while current_chunk_index < header_chunks.chunks.len() {
        let current_chunk = header_chunks.chunks[current_chunk_index].clone();
        let current_chunk_len = current_chunk.len() as u64;
        let mut data_cursor = Cursor::new(current_chunk);
        // Whatever is left after the last message is a gap or the checksum.
        while data_cursor.position() + header_size < current_chunk_len {
            let raw_message_type = data_cursor.read_u8()?;
            let message_header = MessageHeaderV2 {
                message_type: MessageType::from_raw(raw_message_type.into()),
                size: data_cursor.read_u16::<LittleEndian>()?,
                flags: data_cursor.read_u8()?,
            };
            log::trace!("{:?}", message_header);

            if header_size == 6 {
                let _creation_order = data_cursor.read_u16::<LittleEndian>()?;
            }

            let mut current_message_data = vec![0; message_header.size as usize];
            data_cursor.read_exact(&mut current_message_data)?;

            parse_message(
                input,
                current_message_data,
                message_header.message_type,
                message_header.flags,
                HeaderVersion::V2,
                &mut data_object,
                &mut header_chunks,
            )?;
        }
        current_chunk_index += 1;
    }

    Ok(data_object)
}

pub fn parse_data_object(input: &mut impl ReadSeek, offset: u64) -> Result<DataObject, Error> {
    input.seek(SeekFrom::Start(offset))?;
    let version_hint = input.read_u8()?;
    log::trace!("Object header at {} with version hint {}", offset, version_hint);
    if version_hint == 1 {
        parse_v1_objects(version_hint, input)
    } else if version_hint == b'O' {
        parse_v2_objects(version_hint, input)
    } else {
        Err(Error::Hdf5Error(format!(
            "Unsupported data object version hint found: {}",
            version_hint
        )))
    }
}
