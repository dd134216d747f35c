use crate::error::Error;
use std::collections::HashMap;
use std::convert::TryFrom;

use byteorder::{LittleEndian, ReadBytesExt};
use num_enum::TryFromPrimitive;
use std::io::{Read, Seek, SeekFrom};

#[repr(u8)]
#[derive(Clone, Debug, Eq, PartialEq, TryFromPrimitive)]
pub enum BTreeNodeType {
    Group = 0,
    RawDataChunk = 1,
}

#[derive(Clone, Debug)]
pub struct BTreeNodeKey {
    pub chunk_size: u32,
    pub filter_mask: u32,
    pub chunk_offsets: Vec<u64>,
    pub chunk_address: u64,
}

#[derive(Clone, Debug)]
pub struct BTreeNode {
    pub node_type: BTreeNodeType,
    pub node_level: u8,
    pub entries_used: u16,
    pub left_sibling: u64,
    pub right_sibling: u64,
    pub keys: Vec<BTreeNodeKey>,
}

pub fn parse_node(
    input: &mut (impl Read + Seek + ?Sized),
    offset: u64,
    dimensions: usize,
) -> Result<BTreeNode, Error> {
    input.seek(SeekFrom::Start(offset))?;
    let signature = {
        let mut bytes = [0; 4];
        input.read_exact(&mut bytes)?;
        bytes
    };
    if &signature != b"TREE" {
        return Err(Error::Hdf5Error(format!(
            "Wrong BTreeNode signature: {:?}",
            signature
        )));
    }
    let node_type = BTreeNodeType::try_from(input.read_u8()?)?;
    if node_type != BTreeNodeType::RawDataChunk {
        return Err(Error::Hdf5Error(
            "Only raw data chunk nodes are supported".to_string(),
        ));
    }
    let node_level = input.read_u8()?;
    let entries_used = input.read_u16::<LittleEndian>()?;
    let left_sibling = input.read_u64::<LittleEndian>()?;
    let right_sibling = input.read_u64::<LittleEndian>()?;

    let mut keys = vec![];

    for _ in 0..entries_used {
        let chunk_size = input.read_u32::<LittleEndian>()?;
        let filter_mask = input.read_u32::<LittleEndian>()?;
        let mut chunk_offsets = vec![];
        for _ in 0..dimensions {
            chunk_offsets.push(input.read_u64::<LittleEndian>()?);
        }
        let chunk_address = input.read_u64::<LittleEndian>()?;
        keys.push(BTreeNodeKey {
            chunk_size,
            filter_mask,
            chunk_offsets,
            chunk_address,
        });
    }

    Ok(BTreeNode {
        node_type,
        node_level,
        entries_used,
        left_sibling,
        right_sibling,
        keys,
    })
}

/// Walks a chunk B-tree down to its leaves and returns their keys, one per
/// stored chunk.
pub fn collect_chunk_keys(
    input: &mut (impl Read + Seek + ?Sized),
    address: u64,
    dimensions: usize,
) -> Result<Vec<BTreeNodeKey>, Error> {
    let root_node = parse_node(input, address, dimensions)?;

    let mut nodes = HashMap::<u8, Vec<BTreeNode>>::new();
    let mut node_level = root_node.node_level;
    nodes.insert(node_level, vec![root_node]);
    while node_level != 0 {
        let mut next_nodes = vec![];
        for parent_node in &nodes[&node_level] {
            for key in &parent_node.keys {
                next_nodes.push(parse_node(input, key.chunk_address, dimensions)?);
            }
        }
        let next_node_level = match next_nodes.first() {
            Some(node) if node.node_level < node_level => node.node_level,
            _ => {
                return Err(Error::Hdf5Error(format!(
                    "Chunk B-tree level {} has no children below it",
                    node_level
                )))
            }
        };
        nodes.insert(next_node_level, next_nodes);
        node_level = next_node_level;
    }

    Ok(nodes
        .remove(&0)
        .unwrap_or_default()
        .into_iter()
        .flat_map(|node| node.keys)
        .collect())
}
