//! Conversion of an ODIM [`Volume`] into a [`Radar`] record.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use ndarray::{s, Array1};

use crate::error::Error;
use crate::odim::{Attributes, ObjectType, Sweep, Volume};
use crate::radar::{Field, MomentField, Radar, ScanType, FILL_VALUE};

const DATETIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// ODIM quantity, Py-ART field name, units and long name.
const QUANTITIES: &[(&str, &str, &str, &str)] = &[
    ("DBZH", "reflectivity", "dBZ", "Reflectivity"),
    ("DBZV", "reflectivity_vv", "dBZ", "Reflectivity VV"),
    ("TH", "total_power", "dBZ", "Total power"),
    ("TV", "total_power_vv", "dBZ", "Total power VV"),
    ("VRADH", "velocity", "m/s", "Mean doppler velocity"),
    ("VRADV", "velocity_vv", "m/s", "Mean doppler velocity VV"),
    ("WRADH", "spectrum_width", "m/s", "Spectrum width"),
    ("ZDR", "differential_reflectivity", "dB", "Differential reflectivity"),
    ("RHOHV", "cross_correlation_ratio", "ratio", "Cross correlation ratio"),
    ("PHIDP", "differential_phase", "degrees", "Differential phase"),
    ("KDP", "specific_differential_phase", "degrees/km", "Specific differential phase"),
    ("SQIH", "normalized_coherent_power", "ratio", "Normalized coherent power"),
    ("SNRH", "signal_to_noise_ratio", "dB", "Signal to noise ratio"),
];

/// The Py-ART field name for an ODIM quantity. Unknown quantities keep their name.
pub fn field_name(quantity: &str) -> &str {
    QUANTITIES
        .iter()
        .find(|(odim, ..)| *odim == quantity)
        .map(|(_, name, ..)| *name)
        .unwrap_or(quantity)
}

fn quantity_description(quantity: &str) -> Option<(&'static str, &'static str)> {
    QUANTITIES
        .iter()
        .find(|(odim, ..)| *odim == quantity)
        .map(|(_, _, units, long_name)| (*units, *long_name))
}

/// Parses an ODIM `date` (`YYYYMMDD`) and `time` (`HHMMSS`) pair.
pub fn parse_datetime(date: &str, time: &str) -> Result<NaiveDateTime, Error> {
    let joined = format!("{}{}", date.trim(), time.trim());
    NaiveDateTime::parse_from_str(&joined, DATETIME_FORMAT).map_err(|e| {
        Error::OdimError(format!(
            "Cannot parse date {:?} and time {:?}: {}",
            date, time, e
        ))
    })
}

fn find_datetime(
    attributes: &Attributes,
    date: &str,
    time: &str,
) -> Result<Option<NaiveDateTime>, Error> {
    match (attributes.find_str(date)?, attributes.find_str(time)?) {
        (Some(date), Some(time)) => parse_datetime(date, time).map(Some),
        _ => Ok(None),
    }
}

/// The `NOD:` token of an ODIM source string, else `RAD:`, else the whole string.
pub fn instrument_name(source: &str) -> &str {
    let token = |prefix: &str| {
        source
            .split(',')
            .find_map(|part| part.trim().strip_prefix(prefix))
    };
    token("NOD:").or_else(|| token("RAD:")).unwrap_or(source)
}

/// Ray azimuths from the `how/startazA` and `how/stopazA` arrays, or evenly
/// spaced ray centres when they are absent.
fn sweep_azimuths(sweep: &Sweep, nrays: usize) -> Result<Vec<f64>, Error> {
    if sweep.how.contains("startazA") && sweep.how.contains("stopazA") {
        let start = sweep.how.get_f64_array("startazA")?;
        let stop = sweep.how.get_f64_array("stopazA")?;
        if start.len() != nrays || stop.len() != nrays {
            return Err(Error::OdimError(format!(
                "{}/how has {} start and {} stop azimuths for {} rays",
                sweep.name,
                start.len(),
                stop.len(),
                nrays
            )));
        }
        return Ok(start
            .iter()
            .zip(&stop)
            .map(|(&start, &stop)| {
                let stop = if stop < start { stop + 360.0 } else { stop };
                ((start + stop) / 2.0).rem_euclid(360.0)
            })
            .collect());
    }
    log::debug!("{} has no ray azimuths, spacing rays evenly", sweep.name);
    let step = 360.0 / nrays as f64;
    Ok((0..nrays).map(|k| (k as f64 + 0.5) * step).collect())
}

fn sweep_times(sweep: &Sweep, epoch: NaiveDateTime, nrays: usize) -> Result<Vec<f64>, Error> {
    let start = find_datetime(&sweep.what, "startdate", "starttime")?;
    let end = find_datetime(&sweep.what, "enddate", "endtime")?;
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            log::warn!("{} has no start or end time", sweep.name);
            return Ok(vec![0.0; nrays]);
        }
    };
    let start = (start - epoch).num_seconds() as f64;
    let end = (end - epoch).num_seconds() as f64;
    if nrays == 1 {
        return Ok(vec![start]);
    }
    let last = (nrays - 1) as f64;
    Ok((0..nrays)
        .map(|k| start + (end - start) * k as f64 / last)
        .collect())
}

struct SweepGeometry {
    nrays: usize,
    nbins: usize,
}

fn check_supported(volume: &Volume) -> Result<(), Error> {
    match &volume.object {
        ObjectType::Pvol | ObjectType::Scan => {}
        ObjectType::Other(other) => {
            return Err(Error::Unsupported(format!(
                "ODIM object {} is not a polar volume or scan",
                other
            )))
        }
    }
    if volume.sweeps.is_empty() {
        return Err(Error::OdimError(format!(
            "{} has no datasets",
            volume.object.as_str()
        )));
    }
    for sweep in &volume.sweeps {
        let product = sweep.product()?;
        if product != "SCAN" {
            return Err(Error::Unsupported(format!(
                "{} holds a {} product, only PPI scans are supported",
                sweep.name, product
            )));
        }
    }
    Ok(())
}

pub fn convert(volume: &Volume) -> Result<Radar, Error> {
    check_supported(volume)?;

    let geometry = volume
        .sweeps
        .iter()
        .map(|sweep| {
            Ok(SweepGeometry {
                nrays: sweep.nrays()?,
                nbins: sweep.nbins()?,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    let nsweeps = volume.sweeps.len();
    let nrays: usize = geometry.iter().map(|g| g.nrays).sum();
    let ngates = geometry.iter().map(|g| g.nbins).max().unwrap_or(0);

    // Range comes from the first of the longest sweeps.
    let range_sweep = geometry
        .iter()
        .position(|g| g.nbins == ngates)
        .map(|index| &volume.sweeps[index])
        .ok_or_else(|| Error::OdimError("No sweep to take ranges from".to_string()))?;
    let rstart = range_sweep.where_.find_f64("rstart")?.unwrap_or(0.0) * 1000.0;
    let rscale = range_sweep.where_.get_f64("rscale")?;
    let range = Field::new(Array1::from_shape_fn(ngates, |k| rstart + k as f64 * rscale))
        .with_units("meters")
        .with_standard_name("projection_range_coordinate")
        .with_long_name("range_to_measurement_volume");

    let epoch = parse_datetime(volume.what.get_str("date")?, volume.what.get_str("time")?)?;

    let mut start_index = Vec::with_capacity(nsweeps);
    let mut end_index = Vec::with_capacity(nsweeps);
    let mut fixed_angle = Vec::with_capacity(nsweeps);
    let mut azimuth = Vec::with_capacity(nrays);
    let mut elevation = Vec::with_capacity(nrays);
    let mut time = Vec::with_capacity(nrays);
    let mut fields: BTreeMap<String, MomentField> = BTreeMap::new();

    let mut first_ray = 0;
    for (sweep, geometry) in volume.sweeps.iter().zip(&geometry) {
        let elangle = sweep.elangle()?;
        start_index.push(first_ray);
        end_index.push(first_ray + geometry.nrays.saturating_sub(1));
        fixed_angle.push(elangle);
        elevation.extend(std::iter::repeat(elangle).take(geometry.nrays));
        azimuth.extend(sweep_azimuths(sweep, geometry.nrays)?);
        time.extend(sweep_times(sweep, epoch, geometry.nrays)?);

        for moment in &sweep.moments {
            let quantity = moment.quantity()?;
            let scaling = volume.scaling(sweep, moment)?;
            let (rows, cols) = moment.data.dim();
            if rows != geometry.nrays || cols > ngates {
                return Err(Error::OdimError(format!(
                    "{} is {}x{}, expected {} rays of at most {} gates",
                    moment.name, rows, cols, geometry.nrays, ngates
                )));
            }
            let field = fields
                .entry(field_name(quantity).to_string())
                .or_insert_with(|| {
                    let mut field = MomentField::masked(nrays, ngates);
                    if let Some((units, long_name)) = quantity_description(quantity) {
                        field.units = Some(units.to_string());
                        field.long_name = Some(long_name.to_string());
                    }
                    field
                });
            let rays = first_ray..first_ray + rows;
            let mut data = field.data.slice_mut(s![rays.clone(), ..cols]);
            let mut mask = field.mask.slice_mut(s![rays, ..cols]);
            ndarray::Zip::from(&mut data)
                .and(&mut mask)
                .and(&moment.data)
                .for_each(|value, masked, &raw| {
                    if scaling.is_masked(raw) {
                        *value = FILL_VALUE;
                        *masked = true;
                    } else {
                        *value = scaling.apply(raw);
                        *masked = false;
                    }
                });
        }
        first_ray += geometry.nrays;
    }

    let source = volume.source()?.to_string();
    let mut metadata = BTreeMap::new();
    metadata.insert(
        "instrument_name".to_string(),
        instrument_name(&source).to_string(),
    );
    metadata.insert("original_container".to_string(), "odim_h5".to_string());
    if let Some(conventions) = volume.root.find_str("Conventions")? {
        metadata.insert("odim_conventions".to_string(), conventions.to_string());
    }
    if let Some(version) = volume.what.find_str("version")? {
        metadata.insert("version".to_string(), version.to_string());
    }
    metadata.insert("source".to_string(), source);

    let radar = Radar {
        time: Field::new(time)
            .with_units(format!(
                "seconds since {}",
                epoch.format("%Y-%m-%dT%H:%M:%SZ")
            ))
            .with_standard_name("time")
            .with_long_name("time_in_seconds_since_volume_start"),
        range,
        fields,
        metadata,
        scan_type: ScanType::Ppi,
        latitude: Field::scalar(volume.where_.get_f64("lat")?).with_units("degrees_north"),
        longitude: Field::scalar(volume.where_.get_f64("lon")?).with_units("degrees_east"),
        altitude: Field::scalar(volume.where_.get_f64("height")?).with_units("meters"),
        sweep_number: Field::new(Array1::from_iter(0..nsweeps as i32)),
        sweep_mode: Field::new(vec!["azimuth_surveillance".to_string(); nsweeps]),
        fixed_angle: Field::new(fixed_angle).with_units("degrees"),
        sweep_start_ray_index: Field::new(start_index),
        sweep_end_ray_index: Field::new(end_index),
        azimuth: Field::new(azimuth).with_units("degrees"),
        elevation: Field::new(elevation).with_units("degrees"),
        nsweeps,
        ngates,
        nrays,
    };
    radar.validate()?;
    log::info!(
        "Converted {} with {} sweeps, {} rays and {} gates",
        volume.object.as_str(),
        nsweeps,
        nrays,
        ngates
    );
    Ok(radar)
}
