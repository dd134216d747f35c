use std::path::Path;

use ndarray::{Array2, Ix2};
use num_traits::ToPrimitive;

use crate::error::Error;
use crate::odim::attributes::Attributes;
use crate::read::{file::FileReader, group::Group};

/// The `what/object` of an ODIM file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ObjectType {
    Pvol,
    Scan,
    Other(String),
}

impl ObjectType {
    pub fn parse(value: &str) -> ObjectType {
        match value {
            "PVOL" => ObjectType::Pvol,
            "SCAN" => ObjectType::Scan,
            other => ObjectType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::Pvol => "PVOL",
            ObjectType::Scan => "SCAN",
            ObjectType::Other(other) => other,
        }
    }
}

/// An opened ODIM_H5 file: the top level metadata and one [`Sweep`] per
/// `datasetN` group, in numeric order.
#[derive(Clone, Debug)]
pub struct Volume {
    pub object: ObjectType,
    /// Attributes stored on `/` itself, such as `Conventions`.
    pub root: Attributes,
    pub what: Attributes,
    pub where_: Attributes,
    pub how: Attributes,
    pub sweeps: Vec<Sweep>,
}

#[derive(Clone, Debug)]
pub struct Sweep {
    pub name: String,
    pub what: Attributes,
    pub where_: Attributes,
    pub how: Attributes,
    pub moments: Vec<Moment>,
}

/// One `dataN` group. `data` holds the stored values before gain and offset
/// are applied, shaped rays × bins.
#[derive(Clone, Debug)]
pub struct Moment {
    pub name: String,
    pub what: Attributes,
    pub how: Attributes,
    pub data: Array2<f64>,
}

/// Linear scaling and the sentinel values of a moment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scaling {
    pub gain: f64,
    pub offset: f64,
    pub nodata: Option<f64>,
    pub undetect: Option<f64>,
}

impl Scaling {
    pub fn is_masked(&self, raw: f64) -> bool {
        self.nodata == Some(raw) || self.undetect == Some(raw)
    }

    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.gain + self.offset
    }
}

pub fn open(path: impl AsRef<Path>) -> Result<Volume, Error> {
    let path = path.as_ref();
    log::debug!("Opening {}", path.display());
    let mut file = FileReader::open(path)?;
    Volume::read(&mut file)
}

fn numbered_members(group: &Group, prefix: &str) -> Vec<(u32, String)> {
    let mut members: Vec<(u32, String)> = group
        .keys()
        .into_iter()
        .filter_map(|key| {
            let number = key.strip_prefix(prefix)?.parse::<u32>().ok()?;
            Some((number, key))
        })
        .collect();
    members.sort();
    members
}

fn read_attributes(
    file: &mut FileReader,
    parent: &Group,
    name: &str,
    path: String,
) -> Result<Attributes, Error> {
    if !parent.contains(name) {
        return Ok(Attributes::new(path));
    }
    let group = parent.group(file, name)?;
    Ok(Attributes::from_values(path, group.attribute_values()))
}

impl Volume {
    pub fn read(file: &mut FileReader) -> Result<Volume, Error> {
        let root_group = file.root();
        let what = read_attributes(file, &root_group, "what", "what".to_string())?;
        let object = ObjectType::parse(what.get_str("object")?);

        let mut sweeps = vec![];
        for (_, name) in numbered_members(&root_group, "dataset") {
            let group = root_group.group(file, &name)?;
            sweeps.push(Sweep::read(file, &group, name)?);
        }
        log::debug!("{} with {} sweeps", object.as_str(), sweeps.len());

        Ok(Volume {
            object,
            root: Attributes::from_values("/", root_group.attribute_values()),
            where_: read_attributes(file, &root_group, "where", "where".to_string())?,
            how: read_attributes(file, &root_group, "how", "how".to_string())?,
            what,
            sweeps,
        })
    }

    pub fn source(&self) -> Result<&str, Error> {
        self.what.get_str("source")
    }

    /// Resolves a moment's scaling, falling back from the moment to its sweep
    /// and then to the volume for every attribute.
    pub fn scaling(&self, sweep: &Sweep, moment: &Moment) -> Result<Scaling, Error> {
        let levels = [&moment.what, &sweep.what, &self.what];
        let lookup = |name: &str| -> Result<Option<f64>, Error> {
            for attributes in levels {
                if let Some(value) = attributes.find_f64(name)? {
                    return Ok(Some(value));
                }
            }
            Ok(None)
        };
        Ok(Scaling {
            gain: lookup("gain")?.unwrap_or(1.0),
            offset: lookup("offset")?.unwrap_or(0.0),
            nodata: lookup("nodata")?,
            undetect: lookup("undetect")?,
        })
    }
}

impl Sweep {
    fn read(file: &mut FileReader, group: &Group, name: String) -> Result<Sweep, Error> {
        let mut moments = vec![];
        for (_, moment_name) in numbered_members(group, "data") {
            let moment_group = group.group(file, &moment_name)?;
            moments.push(Moment::read(
                file,
                &moment_group,
                format!("{}/{}", name, moment_name),
            )?);
        }
        Ok(Sweep {
            what: read_attributes(file, group, "what", format!("{}/what", name))?,
            where_: read_attributes(file, group, "where", format!("{}/where", name))?,
            how: read_attributes(file, group, "how", format!("{}/how", name))?,
            moments,
            name,
        })
    }

    pub fn product(&self) -> Result<&str, Error> {
        self.what.get_str("product")
    }

    pub fn elangle(&self) -> Result<f64, Error> {
        self.where_.get_f64("elangle")
    }

    /// `where/nrays`, or the row count of the first moment when it is absent.
    pub fn nrays(&self) -> Result<usize, Error> {
        if self.where_.contains("nrays") {
            return count(&self.where_, "nrays");
        }
        match self.moments.first() {
            Some(moment) => Ok(moment.data.nrows()),
            None => count(&self.where_, "nrays"),
        }
    }

    pub fn nbins(&self) -> Result<usize, Error> {
        if self.where_.contains("nbins") {
            return count(&self.where_, "nbins");
        }
        match self.moments.first() {
            Some(moment) => Ok(moment.data.ncols()),
            None => count(&self.where_, "nbins"),
        }
    }
}

fn count(attributes: &Attributes, name: &str) -> Result<usize, Error> {
    let value = attributes.get_i64(name)?;
    value.to_usize().ok_or_else(|| {
        Error::OdimError(format!(
            "{}/{} must not be negative, found {}",
            attributes.group(),
            name,
            value
        ))
    })
}

impl Moment {
    fn read(file: &mut FileReader, group: &Group, name: String) -> Result<Moment, Error> {
        let data = group
            .dataset(file, "data")?
            .read_f64(file)?
            .into_dimensionality::<Ix2>()?;
        Ok(Moment {
            what: read_attributes(file, group, "what", format!("{}/what", name))?,
            how: read_attributes(file, group, "how", format!("{}/how", name))?,
            data,
            name,
        })
    }

    pub fn quantity(&self) -> Result<&str, Error> {
        self.what.get_str("quantity")
    }
}
