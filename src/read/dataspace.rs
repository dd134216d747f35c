use crate::error::Error;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

/// Dataspace flag: maximum dimensions follow the current ones.
const MAX_DIMENSIONS_PRESENT: u8 = 0b01;

#[derive(Clone, Debug)]
pub struct Dataspace {
    pub shape: Vec<u64>,
    /// `u64::MAX` marks an unlimited dimension.
    pub max_shape: Option<Vec<u64>>,
    pub null: bool,
}

impl Dataspace {
    /// Scalar dataspaces have an empty shape and hold a single element.
    pub fn element_count(&self) -> u64 {
        if self.null {
            0
        } else {
            self.shape
                .iter()
                .fold(1u64, |count, &extent| count.saturating_mul(extent))
        }
    }

    pub fn is_scalar(&self) -> bool {
        !self.null && self.shape.is_empty()
    }
}

fn read_extents(input: &mut impl Read, dimensions: u8) -> Result<Vec<u64>, Error> {
    let mut extents = Vec::with_capacity(dimensions.into());
    for _ in 0..dimensions {
        extents.push(input.read_u64::<LittleEndian>()?);
    }
    Ok(extents)
}

pub fn parse_dataspace_message(input: &mut impl Read) -> Result<Dataspace, Error> {
    let version = input.read_u8()?;
    let (dimensions, flags, null) = match version {
        1 => {
            let dimensionality = input.read_u8()?;
            let flags = input.read_u8()?;
            let _reserved_0 = input.read_u8()?;
            let _reserved_1 = input.read_u32::<LittleEndian>()?;
            (dimensionality, flags, false)
        }
        2 => {
            let dimensionality = input.read_u8()?;
            let flags = input.read_u8()?;
            let space_type = input.read_u8()?;
            (dimensionality, flags, space_type == 2)
        }
        _ => {
            return Err(Error::Hdf5Error(format!(
                "Unsupported dataspace version: {}",
                version
            )));
        }
    };
    let shape = read_extents(input, dimensions)?;
    let max_shape = if flags & MAX_DIMENSIONS_PRESENT != 0 {
        Some(read_extents(input, dimensions)?)
    } else {
        None
    };
    // Version 1 permutation indices may follow; they are not read.
    Ok(Dataspace {
        shape,
        max_shape,
        null,
    })
}
