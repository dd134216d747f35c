use std::string::FromUtf8Error;

use num_enum::{TryFromPrimitive, TryFromPrimitiveError};

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    NetworkError(reqwest::Error),
    ShapeError(ndarray::ShapeError),
    Hdf5Error(String),
    OdimError(String),
    MissingAttribute { group: String, name: String },
    Unsupported(String),
    InvalidRecord(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(err) => write!(fmt, "I/O error: {}", err),
            Error::NetworkError(err) => write!(fmt, "network error: {}", err),
            Error::ShapeError(err) => write!(fmt, "array shape error: {}", err),
            Error::Hdf5Error(message) => write!(fmt, "HDF5 error: {}", message),
            Error::OdimError(message) => write!(fmt, "ODIM error: {}", message),
            Error::MissingAttribute { group, name } => {
                write!(fmt, "missing attribute '{}' in group '{}'", name, group)
            }
            Error::Unsupported(message) => write!(fmt, "unsupported input: {}", message),
            Error::InvalidRecord(message) => write!(fmt, "invalid radar record: {}", message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            Error::NetworkError(err) => Some(err),
            Error::ShapeError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Error {
        Error::NetworkError(err)
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(err: ndarray::ShapeError) -> Error {
        Error::ShapeError(err)
    }
}

impl<T: TryFromPrimitive> From<TryFromPrimitiveError<T>> for Error {
    fn from(error: TryFromPrimitiveError<T>) -> Self {
        Error::Hdf5Error(format!(
            "Unexpected data found for {}: {:?}",
            std::any::type_name::<T>(),
            error
        ))
    }
}

impl From<FromUtf8Error> for Error {
    fn from(_error: FromUtf8Error) -> Self {
        Error::Hdf5Error("Could not convert string from UTF8 bytes".to_string())
    }
}
