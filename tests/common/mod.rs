//! A minimal HDF5 writer for building ODIM_H5 test files in memory.
//!
//! It writes the same structures BALTRAD's HDF5 library produces for radar
//! files: a version 0 superblock, a root group indexed by a symbol table,
//! version 1 object headers (split with continuation blocks when large),
//! contiguous datasets and deflate-compressed chunked datasets.

#![allow(dead_code)]

use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};
use ndarray::Array2;
use odim_bridge::read::attribute::AttributeValue;

const UNDEFINED_ADDRESS: u64 = u64::MAX;
const SUPERBLOCK_SIZE: usize = 56;
const ROOT_ENTRY_SIZE: usize = 40;
const SPLIT_HEADER_SIZE: usize = 256;

const MESSAGE_DATASPACE: u16 = 0x0001;
const MESSAGE_DATATYPE: u16 = 0x0003;
const MESSAGE_LINK: u16 = 0x0006;
const MESSAGE_LAYOUT: u16 = 0x0008;
const MESSAGE_FILTER_PIPELINE: u16 = 0x000B;
const MESSAGE_ATTRIBUTE: u16 = 0x000C;
const MESSAGE_CONTINUATION: u16 = 0x0010;
const MESSAGE_SYMBOL_TABLE: u16 = 0x0011;

pub type Attribute = (String, AttributeValue);

pub fn attr(name: &str, value: impl Into<AttributeValue>) -> Attribute {
    (name.to_string(), value.into())
}

/// Element types the writer can store in datasets.
#[derive(Clone, Copy, Debug)]
pub enum Element {
    U8,
    U16Big,
    F64,
}

impl Element {
    fn size(self) -> usize {
        match self {
            Element::U8 => 1,
            Element::U16Big => 2,
            Element::F64 => 8,
        }
    }

    fn datatype(self) -> Vec<u8> {
        match self {
            Element::U8 => integer_datatype(1, false, false),
            Element::U16Big => integer_datatype(2, false, true),
            Element::F64 => float_datatype(),
        }
    }

    fn encode(self, value: f64) -> Vec<u8> {
        match self {
            Element::U8 => vec![value as u8],
            Element::U16Big => (value as u16).to_be_bytes().to_vec(),
            Element::F64 => value.to_le_bytes().to_vec(),
        }
    }
}

fn pad8(bytes: &mut Vec<u8>) {
    while bytes.len() % 8 != 0 {
        bytes.push(0);
    }
}

fn padded(mut bytes: Vec<u8>) -> Vec<u8> {
    pad8(&mut bytes);
    bytes
}

fn integer_datatype(size: u32, signed: bool, big_endian: bool) -> Vec<u8> {
    let mut bits = 0u8;
    if big_endian {
        bits |= 0x01;
    }
    if signed {
        bits |= 0x08;
    }
    let mut bytes = vec![0x10, bits, 0, 0];
    bytes.extend_from_slice(&size.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&(size as u16 * 8).to_le_bytes());
    bytes
}

fn float_datatype() -> Vec<u8> {
    let mut bytes = vec![0x11, 0x20, 0x3f, 0x00];
    bytes.extend_from_slice(&8u32.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&64u16.to_le_bytes());
    bytes.extend_from_slice(&[52, 11, 0, 52]);
    bytes.extend_from_slice(&1023u32.to_le_bytes());
    bytes
}

fn string_datatype(size: usize) -> Vec<u8> {
    let mut bytes = vec![0x13, 0x00, 0, 0];
    bytes.extend_from_slice(&(size as u32).to_le_bytes());
    bytes
}

fn dataspace(shape: &[usize]) -> Vec<u8> {
    let mut bytes = vec![1, shape.len() as u8, 0, 0, 0, 0, 0, 0];
    for &extent in shape {
        bytes.extend_from_slice(&(extent as u64).to_le_bytes());
    }
    bytes
}

fn fixed_strings(values: &[&str]) -> (usize, Vec<u8>) {
    let size = values.iter().map(|v| v.len()).max().unwrap_or(0) + 1;
    let mut raw = vec![];
    for value in values {
        let start = raw.len();
        raw.extend_from_slice(value.as_bytes());
        raw.resize(start + size, 0);
    }
    (size, raw)
}

/// Datatype, dataspace and raw bytes of an attribute value.
fn encode_value(value: &AttributeValue) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    match value {
        AttributeValue::Integer(v) => (
            integer_datatype(8, true, false),
            dataspace(&[]),
            v.to_le_bytes().to_vec(),
        ),
        AttributeValue::Float(v) => (float_datatype(), dataspace(&[]), v.to_le_bytes().to_vec()),
        AttributeValue::String(v) => {
            let (size, raw) = fixed_strings(&[v.as_str()]);
            (string_datatype(size), dataspace(&[]), raw)
        }
        AttributeValue::IntegerArray(values) => (
            integer_datatype(8, true, false),
            dataspace(&[values.len()]),
            values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        ),
        AttributeValue::FloatArray(values) => (
            float_datatype(),
            dataspace(&[values.len()]),
            values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        ),
        AttributeValue::StringArray(values) => {
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            let (size, raw) = fixed_strings(&values);
            (string_datatype(size), dataspace(&[values.len()]), raw)
        }
    }
}

fn attribute_message((name, value): &Attribute) -> (u16, Vec<u8>) {
    let (datatype, dataspace, raw) = encode_value(value);
    let mut name_bytes = name.as_bytes().to_vec();
    name_bytes.push(0);
    let mut bytes = vec![1, 0];
    bytes.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
    bytes.extend_from_slice(&(datatype.len() as u16).to_le_bytes());
    bytes.extend_from_slice(&(dataspace.len() as u16).to_le_bytes());
    for block in [name_bytes, datatype, dataspace] {
        bytes.extend(padded(block));
    }
    bytes.extend(raw);
    (MESSAGE_ATTRIBUTE, bytes)
}

fn link_message(name: &str, address: u64) -> (u16, Vec<u8>) {
    let mut bytes = vec![1, 0, name.len() as u8];
    bytes.extend_from_slice(name.as_bytes());
    bytes.extend_from_slice(&address.to_le_bytes());
    (MESSAGE_LINK, bytes)
}

fn encode_messages(messages: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut bytes = vec![];
    for (message_type, body) in messages {
        let body = padded(body.clone());
        bytes.extend_from_slice(&message_type.to_le_bytes());
        bytes.extend_from_slice(&(body.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes.extend(body);
    }
    bytes
}

/// Builds a file bottom-up: children are written before the objects that
/// link to them, so every address is known when a header is encoded.
pub struct Writer {
    bytes: Vec<u8>,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    pub fn new() -> Self {
        Writer {
            bytes: vec![0; SUPERBLOCK_SIZE + ROOT_ENTRY_SIZE],
        }
    }

    fn append(&mut self, bytes: &[u8]) -> u64 {
        pad8(&mut self.bytes);
        let address = self.bytes.len() as u64;
        self.bytes.extend_from_slice(bytes);
        address
    }

    /// Writes a version 1 object header. Large headers keep their first
    /// messages in the header and move the rest to a continuation block.
    fn object_header(&mut self, messages: Vec<(u16, Vec<u8>)>) -> u64 {
        let total = encode_messages(&messages).len();
        let (head, tail) = if total > SPLIT_HEADER_SIZE && messages.len() > 1 {
            let mut split = 1;
            while split < messages.len() - 1
                && encode_messages(&messages[..split + 1]).len() <= SPLIT_HEADER_SIZE
            {
                split += 1;
            }
            let (head, tail) = messages.split_at(split);
            (head.to_vec(), tail.to_vec())
        } else {
            (messages, vec![])
        };

        let mut head_messages = head;
        let mut message_count = head_messages.len() + tail.len();
        if !tail.is_empty() {
            let block = encode_messages(&tail);
            let block_address = self.append(&block);
            let mut continuation = block_address.to_le_bytes().to_vec();
            continuation.extend_from_slice(&(block.len() as u64).to_le_bytes());
            head_messages.push((MESSAGE_CONTINUATION, continuation));
            message_count += 1;
        }

        let encoded = encode_messages(&head_messages);
        let mut header = vec![1, 0];
        header.extend_from_slice(&(message_count as u16).to_le_bytes());
        header.extend_from_slice(&1u32.to_le_bytes());
        header.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes());
        header.extend(encoded);
        self.append(&header)
    }

    /// A group whose members are stored as link messages in its header.
    pub fn group(&mut self, attributes: &[Attribute], members: &[(&str, u64)]) -> u64 {
        let mut messages: Vec<(u16, Vec<u8>)> = members
            .iter()
            .map(|(name, address)| link_message(name, *address))
            .collect();
        messages.extend(attributes.iter().map(attribute_message));
        self.object_header(messages)
    }

    fn dataset_header(
        &mut self,
        shape: &[usize],
        element: Element,
        layout: Vec<u8>,
        filters: Option<Vec<u8>>,
        attributes: &[Attribute],
    ) -> u64 {
        let mut messages = vec![
            (MESSAGE_DATASPACE, dataspace(shape)),
            (MESSAGE_DATATYPE, element.datatype()),
        ];
        if let Some(filters) = filters {
            messages.push((MESSAGE_FILTER_PIPELINE, filters));
        }
        messages.push((MESSAGE_LAYOUT, layout));
        messages.extend(attributes.iter().map(attribute_message));
        self.object_header(messages)
    }

    pub fn contiguous_dataset(
        &mut self,
        data: &Array2<f64>,
        element: Element,
        attributes: &[Attribute],
    ) -> u64 {
        let raw: Vec<u8> = data.iter().flat_map(|&v| element.encode(v)).collect();
        let address = self.append(&raw);
        let mut layout = vec![3, 1];
        layout.extend_from_slice(&address.to_le_bytes());
        layout.extend_from_slice(&(raw.len() as u64).to_le_bytes());
        let (rows, cols) = data.dim();
        self.dataset_header(&[rows, cols], element, layout, None, attributes)
    }

    /// A deflate-compressed dataset split into `chunk`-shaped pieces. Edge
    /// chunks are stored at full size with zero fill, as HDF5 does.
    pub fn chunked_dataset(
        &mut self,
        data: &Array2<f64>,
        element: Element,
        chunk: (usize, usize),
        attributes: &[Attribute],
    ) -> u64 {
        let (rows, cols) = data.dim();
        let item_size = element.size();
        let mut keys = vec![];
        for row_offset in (0..rows).step_by(chunk.0) {
            for col_offset in (0..cols).step_by(chunk.1) {
                let mut raw = Vec::with_capacity(chunk.0 * chunk.1 * item_size);
                for row in row_offset..row_offset + chunk.0 {
                    for col in col_offset..col_offset + chunk.1 {
                        match data.get((row, col)) {
                            Some(&value) => raw.extend(element.encode(value)),
                            None => raw.extend(std::iter::repeat(0).take(item_size)),
                        }
                    }
                }
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(6));
                encoder.write_all(&raw).unwrap();
                let compressed = encoder.finish().unwrap();
                let address = self.append(&compressed);
                keys.push((compressed.len() as u32, [row_offset, col_offset], address));
            }
        }

        let mut tree = b"TREE".to_vec();
        tree.push(1);
        tree.push(0);
        tree.extend_from_slice(&(keys.len() as u16).to_le_bytes());
        tree.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes());
        tree.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes());
        for (size, offsets, address) in &keys {
            tree.extend_from_slice(&size.to_le_bytes());
            tree.extend_from_slice(&0u32.to_le_bytes());
            for offset in offsets {
                tree.extend_from_slice(&(*offset as u64).to_le_bytes());
            }
            tree.extend_from_slice(&0u64.to_le_bytes());
            tree.extend_from_slice(&address.to_le_bytes());
        }
        // Final key bounding the last chunk.
        tree.extend_from_slice(&0u32.to_le_bytes());
        tree.extend_from_slice(&0u32.to_le_bytes());
        tree.extend_from_slice(&(rows as u64).to_le_bytes());
        tree.extend_from_slice(&(cols as u64).to_le_bytes());
        tree.extend_from_slice(&0u64.to_le_bytes());
        let tree_address = self.append(&tree);

        let mut layout = vec![3, 2, 3];
        layout.extend_from_slice(&tree_address.to_le_bytes());
        layout.extend_from_slice(&(chunk.0 as u32).to_le_bytes());
        layout.extend_from_slice(&(chunk.1 as u32).to_le_bytes());
        layout.extend_from_slice(&(item_size as u32).to_le_bytes());

        let mut filters = vec![1, 1, 0, 0, 0, 0, 0, 0];
        filters.extend_from_slice(&1u16.to_le_bytes());
        filters.extend_from_slice(&0u16.to_le_bytes());
        filters.extend_from_slice(&0u16.to_le_bytes());
        filters.extend_from_slice(&1u16.to_le_bytes());
        filters.extend_from_slice(&6u32.to_le_bytes());
        filters.extend_from_slice(&0u32.to_le_bytes());

        self.dataset_header(&[rows, cols], element, layout, Some(filters), attributes)
    }

    /// Writes the root group, indexed by a symbol table, and the superblock,
    /// and returns the finished file.
    pub fn finish(mut self, attributes: &[Attribute], members: &[(&str, u64)]) -> Vec<u8> {
        let mut heap_data = vec![0u8; 8];
        let mut name_offsets = vec![];
        for (name, _) in members {
            name_offsets.push(heap_data.len() as u64);
            heap_data.extend_from_slice(name.as_bytes());
            heap_data.push(0);
            pad8(&mut heap_data);
        }
        let heap_data_address = self.append(&heap_data);
        let mut heap = b"HEAP".to_vec();
        heap.extend_from_slice(&[0, 0, 0, 0]);
        heap.extend_from_slice(&(heap_data.len() as u64).to_le_bytes());
        heap.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes());
        heap.extend_from_slice(&heap_data_address.to_le_bytes());
        let heap_address = self.append(&heap);

        let mut node = b"SNOD".to_vec();
        node.extend_from_slice(&[1, 0]);
        node.extend_from_slice(&(members.len() as u16).to_le_bytes());
        for ((_, address), name_offset) in members.iter().zip(&name_offsets) {
            node.extend_from_slice(&name_offset.to_le_bytes());
            node.extend_from_slice(&address.to_le_bytes());
            node.extend_from_slice(&0u32.to_le_bytes());
            node.extend_from_slice(&0u32.to_le_bytes());
            node.extend_from_slice(&[0; 16]);
        }
        let node_address = self.append(&node);

        let mut tree = b"TREE".to_vec();
        tree.extend_from_slice(&[0, 0]);
        tree.extend_from_slice(&1u16.to_le_bytes());
        tree.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes());
        tree.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes());
        tree.extend_from_slice(&0u64.to_le_bytes());
        tree.extend_from_slice(&node_address.to_le_bytes());
        tree.extend_from_slice(&name_offsets.last().copied().unwrap_or(0).to_le_bytes());
        let tree_address = self.append(&tree);

        let mut symbol_table = tree_address.to_le_bytes().to_vec();
        symbol_table.extend_from_slice(&heap_address.to_le_bytes());
        let mut messages = vec![(MESSAGE_SYMBOL_TABLE, symbol_table)];
        messages.extend(attributes.iter().map(attribute_message));
        let root_address = self.object_header(messages);

        pad8(&mut self.bytes);
        let end_of_file = self.bytes.len() as u64;
        let mut superblock = vec![137, 72, 68, 70, 13, 10, 26, 10];
        superblock.extend_from_slice(&[0, 0, 0, 0, 0, 8, 8, 0]);
        superblock.extend_from_slice(&4u16.to_le_bytes());
        superblock.extend_from_slice(&16u16.to_le_bytes());
        superblock.extend_from_slice(&0u32.to_le_bytes());
        superblock.extend_from_slice(&0u64.to_le_bytes());
        superblock.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes());
        superblock.extend_from_slice(&end_of_file.to_le_bytes());
        superblock.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes());
        superblock.extend_from_slice(&0u64.to_le_bytes());
        superblock.extend_from_slice(&root_address.to_le_bytes());
        superblock.extend_from_slice(&1u32.to_le_bytes());
        superblock.extend_from_slice(&0u32.to_le_bytes());
        superblock.extend_from_slice(&tree_address.to_le_bytes());
        superblock.extend_from_slice(&heap_address.to_le_bytes());
        self.bytes[..superblock.len()].copy_from_slice(&superblock);
        self.bytes
    }
}

pub const NODATA: f64 = 255.0;
pub const UNDETECT: f64 = 0.0;
pub const GAIN: f64 = 0.5;
pub const OFFSET: f64 = -32.0;
pub const SOURCE: &str = "WMO:02570,PLC:Norrköping,RAD:SE53,NOD:senkp";

/// One sweep of a synthetic volume.
#[derive(Clone, Debug)]
pub struct SweepSpec {
    pub elangle: f64,
    pub nrays: usize,
    pub nbins: usize,
    pub azimuth_offset: f64,
    pub starttime: String,
    pub endtime: String,
    pub product: String,
    /// Stores DBZH chunked and compressed instead of contiguous.
    pub chunked: bool,
    /// Adds a big-endian 16 bit TH moment.
    pub total_power: bool,
}

/// The stored DBZH value of a gate, cycling through both sentinels.
pub fn raw_value(ray: usize, gate: usize) -> f64 {
    ((ray * 7 + gate) % 256) as f64
}

fn hms(seconds: usize) -> String {
    format!(
        "{:02}{:02}{:02}",
        seconds / 3600,
        seconds / 60 % 60,
        seconds % 60
    )
}

/// The six sweeps of the Norrköping polar volume of 2012-02-26 10:27:51.
pub fn pvol_sweeps() -> Vec<SweepSpec> {
    let elangles = [0.0, 1.1, 23.5, 28.2, 33.7, 40.0];
    let offsets = [0.04, 0.03, 0.01, 0.03, 0.04, 0.02];
    let volume_start = 10 * 3600 + 27 * 60 + 51;
    (0..6)
        .map(|index| {
            let (start, end) = if index == 5 {
                (volume_start + 200, volume_start + 236)
            } else {
                (volume_start + index * 36, volume_start + index * 36 + 30)
            };
            SweepSpec {
                elangle: elangles[index],
                nrays: 361,
                nbins: 800,
                azimuth_offset: offsets[index],
                starttime: hms(start),
                endtime: hms(end),
                product: "SCAN".to_string(),
                chunked: index % 2 == 0,
                total_power: index == 1,
            }
        })
        .collect()
}

fn write_sweep(writer: &mut Writer, sweep: &SweepSpec) -> u64 {
    let what = writer.group(
        &[
            attr("product", sweep.product.as_str()),
            attr("startdate", "20120226"),
            attr("starttime", sweep.starttime.as_str()),
            attr("enddate", "20120226"),
            attr("endtime", sweep.endtime.as_str()),
        ],
        &[],
    );
    let where_ = writer.group(
        &[
            attr("elangle", sweep.elangle),
            attr("nbins", sweep.nbins as i64),
            attr("nrays", sweep.nrays as i64),
            attr("rstart", 0.0),
            attr("rscale", 250.0),
            attr("a1gate", 0i64),
        ],
        &[],
    );
    let start: Vec<f64> = (0..sweep.nrays)
        .map(|k| (k as f64 - 0.5 + sweep.azimuth_offset).rem_euclid(360.0))
        .collect();
    let stop: Vec<f64> = (0..sweep.nrays)
        .map(|k| (k as f64 + 0.5 + sweep.azimuth_offset).rem_euclid(360.0))
        .collect();
    let how = writer.group(&[attr("startazA", start), attr("stopazA", stop)], &[]);

    let data = Array2::from_shape_fn((sweep.nrays, sweep.nbins), |(ray, gate)| {
        raw_value(ray, gate)
    });
    let dataset = if sweep.chunked {
        writer.chunked_dataset(
            &data,
            Element::U8,
            (64, 512),
            &[attr("CLASS", "IMAGE"), attr("IMAGE_VERSION", "1.2")],
        )
    } else {
        writer.contiguous_dataset(&data, Element::U8, &[attr("CLASS", "IMAGE")])
    };
    let moment_what = writer.group(
        &[
            attr("quantity", "DBZH"),
            attr("gain", GAIN),
            attr("offset", OFFSET),
            attr("nodata", NODATA),
            attr("undetect", UNDETECT),
        ],
        &[],
    );
    let data1 = writer.group(&[], &[("data", dataset), ("what", moment_what)]);
    let mut members = vec![("data1", data1)];

    if sweep.total_power {
        let data = Array2::from_shape_fn((sweep.nrays, sweep.nbins), |(ray, gate)| {
            (1000 + ray + gate) as f64
        });
        let dataset = writer.contiguous_dataset(&data, Element::U16Big, &[]);
        let moment_what = writer.group(
            &[
                attr("quantity", "TH"),
                attr("gain", 0.01),
                attr("offset", 0.0),
                attr("nodata", 65535.0),
                attr("undetect", 0.0),
            ],
            &[],
        );
        members.push(("data2", writer.group(&[], &[("data", dataset), ("what", moment_what)])));
    }

    members.extend([("how", how), ("what", what), ("where", where_)]);
    writer.group(&[], &members)
}

/// A complete ODIM_H5 file with one `datasetN` group per sweep.
pub fn odim_file(object: &str, sweeps: &[SweepSpec]) -> Vec<u8> {
    let mut writer = Writer::new();
    let what = writer.group(
        &[
            attr("object", object),
            attr("version", "H5rad 2.2"),
            attr("date", "20120226"),
            attr("time", "102751"),
            attr("source", SOURCE),
        ],
        &[],
    );
    let where_ = writer.group(
        &[
            attr("lat", 58.10559844970703),
            attr("lon", 15.936100006103516),
            attr("height", 222.0),
        ],
        &[],
    );
    let how = writer.group(&[attr("beamwidth", 0.9), attr("wavelength", 5.35)], &[]);

    let names: Vec<String> = (1..=sweeps.len()).map(|n| format!("dataset{}", n)).collect();
    let mut members: Vec<(&str, u64)> = vec![("how", how), ("what", what), ("where", where_)];
    for (name, sweep) in names.iter().zip(sweeps) {
        members.push((name.as_str(), write_sweep(&mut writer, sweep)));
    }
    writer.finish(&[attr("Conventions", "ODIM_H5/V2_2")], &members)
}

pub fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}
