use crate::error::Error;
use crate::read::{
    attribute::AttributeValue,
    data_object::DataObject,
    data_storage::DataStorage,
    dataspace::Dataspace,
    datatype::{Datatype, DatatypeEncoding, Endianness},
    file::FileReader,
    filter_pipeline::{unshuffle, FilterPipeline, FilterType},
    io::read_block,
    node::{collect_chunk_keys, BTreeNodeKey},
    superblock::UNDEFINED_ADDRESS,
};
use ndarray::{Array, ArrayD, Dimension, IxDyn};
use std::{
    collections::BTreeMap,
    fmt::Debug,
    io::{Cursor, Read, Seek, SeekFrom},
};

#[derive(Clone, Debug)]
pub struct Dataset {
    pub data_object: DataObject,
}

pub trait DatatypeVerifiable: Sized {
    fn verify(datatype: &Datatype) -> Result<(), Error>;
    fn decode(bytes: &[u8], endianness: Endianness) -> Self;
}

macro_rules! add_verifiable_type {
    ($rust_type:ty, $encoding:expr, $size:expr, $signed:expr) => {
        impl DatatypeVerifiable for $rust_type {
            fn verify(datatype: &Datatype) -> Result<(), Error> {
                let signed_matches = datatype.encoding != DatatypeEncoding::FixedPoint
                    || datatype.is_signed() == $signed;
                if datatype.encoding != $encoding || datatype.size != $size || !signed_matches {
                    return Err(Error::Hdf5Error(format!(
                        "Wrong datatype found for {}: {:?}",
                        stringify!($rust_type),
                        datatype
                    )));
                }
                Ok(())
            }

            fn decode(bytes: &[u8], endianness: Endianness) -> Self {
                let mut array = [0; $size];
                array.copy_from_slice(bytes);
                match endianness {
                    Endianness::Little => <$rust_type>::from_le_bytes(array),
                    Endianness::Big => <$rust_type>::from_be_bytes(array),
                }
            }
        }
    };
}

add_verifiable_type!(f32, DatatypeEncoding::FloatingPoint, 4, true);
add_verifiable_type!(f64, DatatypeEncoding::FloatingPoint, 8, true);
add_verifiable_type!(u8, DatatypeEncoding::FixedPoint, 1, false);
add_verifiable_type!(i8, DatatypeEncoding::FixedPoint, 1, true);
add_verifiable_type!(u16, DatatypeEncoding::FixedPoint, 2, false);
add_verifiable_type!(i16, DatatypeEncoding::FixedPoint, 2, true);
add_verifiable_type!(u32, DatatypeEncoding::FixedPoint, 4, false);
add_verifiable_type!(i32, DatatypeEncoding::FixedPoint, 4, true);
add_verifiable_type!(i64, DatatypeEncoding::FixedPoint, 8, true);

fn row_major_index(index: &[usize], shape: &[usize]) -> usize {
    index
        .iter()
        .zip(shape)
        .fold(0, |linear, (&i, &extent)| linear * extent + i)
}

impl Dataset {
    pub fn dataspace(&self) -> Result<&Dataspace, Error> {
        self.data_object
            .dataspaces
            .first()
            .ok_or_else(|| Error::Hdf5Error("Dataset has no dataspace".to_string()))
    }

    pub fn shape(&self) -> Result<Vec<usize>, Error> {
        Ok(self.dataspace()?.shape.iter().map(|&x| x as usize).collect())
    }

    pub fn datatype(&self) -> Result<&Datatype, Error> {
        self.data_object
            .datatypes
            .first()
            .ok_or_else(|| Error::Hdf5Error("Dataset has no datatype".to_string()))
    }

    pub fn attribute_values(&self) -> BTreeMap<String, AttributeValue> {
        self.data_object.attribute_values()
    }

    pub fn read<T, D>(&self, file: &mut FileReader) -> Result<Array<T, D>, Error>
    where
        T: Clone + Copy + Debug + DatatypeVerifiable,
        D: Dimension,
    {
        let datatype = self.datatype()?;
        T::verify(datatype)?;
        let endianness = datatype.endianness();
        let raw = self.read_raw(file)?;
        let vector: Vec<T> = raw
            .chunks_exact(datatype.size as usize)
            .map(|bytes| T::decode(bytes, endianness))
            .collect();
        let array = ArrayD::from_shape_vec(IxDyn(&self.shape()?), vector)?;
        Ok(array.into_dimensionality()?)
    }

    /// Reads any numeric dataset, widening the elements to `f64`.
    pub fn read_f64(&self, file: &mut FileReader) -> Result<ArrayD<f64>, Error> {
        let datatype = self.datatype()?;
        if !datatype.is_numeric() {
            return Err(Error::Hdf5Error(format!(
                "Dataset of type {:?} is not numeric",
                datatype.encoding
            )));
        }
        let raw = self.read_raw(file)?;
        let vector = datatype.decode_f64(&raw)?;
        Ok(ArrayD::from_shape_vec(IxDyn(&self.shape()?), vector)?)
    }

    /// Returns the dataset's bytes in row-major order, with filters undone.
    pub fn read_raw(&self, file: &mut FileReader) -> Result<Vec<u8>, Error> {
        let data_object = &self.data_object;
        let datatype = self.datatype()?;
        let dataspace = self.dataspace()?;
        log::debug!("Reading {:?} {:?}", datatype.encoding, dataspace.shape);
        let expected_size = usize::try_from(
            dataspace
                .element_count()
                .saturating_mul(datatype.size.into()),
        )
        .map_err(|_| Error::Hdf5Error(format!("Dataset {:?} is too large", dataspace.shape)))?;
        let storage = data_object
            .data
            .first()
            .ok_or_else(|| Error::Hdf5Error("Dataset has no data layout".to_string()))?;
        let raw = match storage {
            DataStorage::Compact { data } => data.clone(),
            DataStorage::Contiguous { address, .. } if *address == UNDEFINED_ADDRESS => {
                vec![0; expected_size]
            }
            DataStorage::Contiguous { address, size } => {
                if !data_object.filter_pipelines.is_empty() {
                    return Err(Error::Hdf5Error(
                        "Filters on contiguous data are not supported".to_string(),
                    ));
                }
                file.input.seek(SeekFrom::Start(*address))?;
                read_block(&mut file.input, *size)?
            }
            DataStorage::Chunked {
                chunk_shape,
                address,
            } => self.read_chunked(
                file,
                chunk_shape,
                *address,
                datatype,
                dataspace,
                &data_object.filter_pipelines,
            )?,
        };
        if raw.len() != expected_size {
            return Err(Error::Hdf5Error(format!(
                "Expected {} bytes of data, found {}",
                expected_size,
                raw.len()
            )));
        }
        Ok(raw)
    }

    fn read_chunked(
        &self,
        file: &mut FileReader,
        chunk_shape: &[u32],
        address: u64,
        datatype: &Datatype,
        dataspace: &Dataspace,
        filter_pipelines: &[FilterPipeline],
    ) -> Result<Vec<u8>, Error> {
        let item_size = datatype.size as usize;
        let shape: Vec<usize> = dataspace.shape.iter().map(|&x| x as usize).collect();
        let rank = shape.len();
        if chunk_shape.len() != rank + 1 {
            return Err(Error::Hdf5Error(format!(
                "Chunk shape {:?} does not match dataset rank {}",
                chunk_shape, rank
            )));
        }
        let chunk_dims: Vec<usize> = chunk_shape[..rank].iter().map(|&x| x as usize).collect();
        let chunk_buffer_size = chunk_dims.iter().product::<usize>() * item_size;
        log::debug!("Chunk shape {:?} for data shape {:?}", chunk_dims, shape);

        let mut output = vec![0; shape.iter().product::<usize>() * item_size];
        if address == UNDEFINED_ADDRESS {
            return Ok(output);
        }

        let keys = collect_chunk_keys(&mut file.input, address, rank + 1)?;
        for node_key in &keys {
            file.input.seek(SeekFrom::Start(node_key.chunk_address))?;
            let buffer = if filter_pipelines.is_empty() {
                read_block(&mut file.input, chunk_buffer_size as u64)?
            } else {
                let buffer = read_block(&mut file.input, node_key.chunk_size.into())?;
                apply_filters(buffer, filter_pipelines, node_key.filter_mask, item_size)?
            };
            if buffer.len() != chunk_buffer_size {
                return Err(Error::Hdf5Error(format!(
                    "Chunk at {:?} holds {} bytes, expected {}",
                    node_key.chunk_offsets,
                    buffer.len(),
                    chunk_buffer_size
                )));
            }
            copy_chunk(&buffer, node_key, &chunk_dims, &shape, item_size, &mut output);
        }
        Ok(output)
    }
}

/// Undoes the pipeline in reverse order. Bit `i` of `filter_mask` marks filter
/// `i` as skipped for this chunk.
fn apply_filters(
    mut buffer: Vec<u8>,
    filter_pipelines: &[FilterPipeline],
    filter_mask: u32,
    item_size: usize,
) -> Result<Vec<u8>, Error> {
    for (index, filter) in filter_pipelines.iter().enumerate().rev() {
        if index < 32 && filter_mask & (1 << index) != 0 {
            continue;
        }
        log::trace!("Running filter {:?}", filter.filter_type);
        buffer = match filter.filter_type {
            FilterType::ShuffleFilter => unshuffle(&buffer, item_size),
            FilterType::GzipDeflateFilter => {
                let mut decoder = flate2::read::ZlibDecoder::new(Cursor::new(&buffer));
                let mut decompressed = vec![];
                decoder.read_to_end(&mut decompressed)?;
                decompressed
            }
            FilterType::Fletch32Filter => {
                let checked_length = buffer.len().saturating_sub(4);
                buffer.truncate(checked_length);
                buffer
            }
            _ => {
                return Err(Error::Hdf5Error(format!(
                    "Unsupported filter type: {:?}",
                    filter
                )));
            }
        };
    }
    Ok(buffer)
}

/// Copies one decoded chunk into the row-major output. Edge chunks extend past
/// the dataset bounds and are clipped.
fn copy_chunk(
    chunk: &[u8],
    node_key: &BTreeNodeKey,
    chunk_dims: &[usize],
    shape: &[usize],
    item_size: usize,
    output: &mut [u8],
) {
    let rank = shape.len();
    let offsets: Vec<usize> = node_key.chunk_offsets[..rank]
        .iter()
        .map(|&x| x as usize)
        .collect();
    let (outer_chunk, inner_chunk) = (&chunk_dims[..rank - 1], chunk_dims[rank - 1]);
    let (outer_shape, inner_shape) = (&shape[..rank - 1], shape[rank - 1]);
    let run = inner_chunk.min(inner_shape.saturating_sub(offsets[rank - 1]));
    if run == 0 {
        return;
    }
    for index in ndarray::indices(IxDyn(outer_chunk)) {
        let index = index.slice();
        let global: Vec<usize> = index
            .iter()
            .zip(&offsets)
            .map(|(&i, &offset)| i + offset)
            .collect();
        if global.iter().zip(outer_shape).any(|(&g, &extent)| g >= extent) {
            continue;
        }
        let source = row_major_index(index, outer_chunk) * inner_chunk * item_size;
        let target = (row_major_index(&global, outer_shape) * inner_shape + offsets[rank - 1])
            * item_size;
        let length = run * item_size;
        output[target..target + length].copy_from_slice(&chunk[source..source + length]);
    }
}
