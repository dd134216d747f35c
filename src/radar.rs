//! A radar volume in the Py-ART object model: rays from every sweep laid end to
//! end, with per-sweep index bounds and named-field containers.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};

use crate::error::Error;

pub const FILL_VALUE: f64 = -9999.0;

/// A named-field container: the data plus its descriptive attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct Field<T> {
    pub data: Array1<T>,
    pub units: Option<String>,
    pub standard_name: Option<String>,
    pub long_name: Option<String>,
}

impl<T> Field<T> {
    pub fn new(data: impl Into<Array1<T>>) -> Self {
        Field {
            data: data.into(),
            units: None,
            standard_name: None,
            long_name: None,
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn with_standard_name(mut self, standard_name: impl Into<String>) -> Self {
        self.standard_name = Some(standard_name.into());
        self
    }

    pub fn with_long_name(mut self, long_name: impl Into<String>) -> Self {
        self.long_name = Some(long_name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Field<f64> {
    /// A single-element field, used for the station location.
    pub fn scalar(value: f64) -> Self {
        Field::new(vec![value])
    }

    /// The first element, or NaN for an empty field.
    pub fn value(&self) -> f64 {
        self.data.first().copied().unwrap_or(f64::NAN)
    }
}

/// One measured quantity over the whole volume, shaped rays × gates.
#[derive(Clone, Debug, PartialEq)]
pub struct MomentField {
    pub data: Array2<f64>,
    pub mask: Array2<bool>,
    pub units: Option<String>,
    pub standard_name: Option<String>,
    pub long_name: Option<String>,
    pub fill_value: f64,
}

impl MomentField {
    /// A field with every cell masked.
    pub fn masked(nrays: usize, ngates: usize) -> Self {
        MomentField {
            data: Array2::from_elem((nrays, ngates), FILL_VALUE),
            mask: Array2::from_elem((nrays, ngates), true),
            units: None,
            standard_name: None,
            long_name: None,
            fill_value: FILL_VALUE,
        }
    }

    pub fn get(&self, ray: usize, gate: usize) -> Option<f64> {
        match self.mask.get((ray, gate)) {
            Some(false) => self.data.get((ray, gate)).copied(),
            _ => None,
        }
    }
}

/// Only plan position indicator volumes are converted; other sweep products
/// are rejected before a record is built.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScanType {
    Ppi,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Ppi => "ppi",
        }
    }
}

impl std::fmt::Display for ScanType {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct Radar {
    pub time: Field<f64>,
    pub range: Field<f64>,
    pub fields: BTreeMap<String, MomentField>,
    pub metadata: BTreeMap<String, String>,
    pub scan_type: ScanType,
    pub latitude: Field<f64>,
    pub longitude: Field<f64>,
    pub altitude: Field<f64>,
    pub sweep_number: Field<i32>,
    pub sweep_mode: Field<String>,
    pub fixed_angle: Field<f64>,
    pub sweep_start_ray_index: Field<usize>,
    pub sweep_end_ray_index: Field<usize>,
    pub azimuth: Field<f64>,
    pub elevation: Field<f64>,
    pub nsweeps: usize,
    pub ngates: usize,
    pub nrays: usize,
}

impl Radar {
    /// Inclusive first and last ray index of a sweep.
    pub fn get_start_end(&self, sweep: usize) -> Option<(usize, usize)> {
        Some((
            *self.sweep_start_ray_index.data.get(sweep)?,
            *self.sweep_end_ray_index.data.get(sweep)?,
        ))
    }

    /// Ray indices of a sweep as a half-open range.
    pub fn get_slice(&self, sweep: usize) -> Option<std::ops::Range<usize>> {
        self.get_start_end(sweep).map(|(start, end)| start..end + 1)
    }

    pub fn iter_slice(&self) -> impl Iterator<Item = std::ops::Range<usize>> + '_ {
        (0..self.nsweeps).filter_map(move |sweep| self.get_slice(sweep))
    }

    /// Checks the record's shape invariants: sweep bounds tile every ray
    /// exactly once, and each field has the length its dimension calls for.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |message: String| Err(Error::InvalidRecord(message));

        let per_sweep = [
            ("sweep_number", self.sweep_number.len()),
            ("sweep_mode", self.sweep_mode.len()),
            ("fixed_angle", self.fixed_angle.len()),
            ("sweep_start_ray_index", self.sweep_start_ray_index.len()),
            ("sweep_end_ray_index", self.sweep_end_ray_index.len()),
        ];
        for (name, len) in per_sweep {
            if len != self.nsweeps {
                return invalid(format!("{} has {} entries for {} sweeps", name, len, self.nsweeps));
            }
        }

        let per_ray = [
            ("time", self.time.len()),
            ("azimuth", self.azimuth.len()),
            ("elevation", self.elevation.len()),
        ];
        for (name, len) in per_ray {
            if len != self.nrays {
                return invalid(format!("{} has {} entries for {} rays", name, len, self.nrays));
            }
        }

        if self.range.len() != self.ngates {
            return invalid(format!(
                "range has {} entries for {} gates",
                self.range.len(),
                self.ngates
            ));
        }

        let mut next_start = 0;
        for sweep in 0..self.nsweeps {
            let (start, end) = (
                self.sweep_start_ray_index.data[sweep],
                self.sweep_end_ray_index.data[sweep],
            );
            if start != next_start || end < start {
                return invalid(format!(
                    "sweep {} spans rays {}..={}, expected it to start at {}",
                    sweep, start, end, next_start
                ));
            }
            next_start = end + 1;
        }
        if next_start != self.nrays {
            return invalid(format!(
                "sweeps cover {} rays, the volume has {}",
                next_start, self.nrays
            ));
        }

        for (name, field) in &self.fields {
            if field.data.dim() != (self.nrays, self.ngates) || field.mask.dim() != field.data.dim() {
                return invalid(format!(
                    "field {} is {:?}, expected {:?}",
                    name,
                    field.data.dim(),
                    (self.nrays, self.ngates)
                ));
            }
        }
        Ok(())
    }
}
