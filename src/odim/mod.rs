//! The ODIM_H5 layer: reads the `what`/`where`/`how` metadata groups and the
//! `datasetN`/`dataN` hierarchy of a polar volume or scan into a [`Volume`].

pub mod attributes;
pub mod volume;

pub use attributes::Attributes;
pub use volume::{open, Moment, ObjectType, Scaling, Sweep, Volume};
