pub mod bridge;
pub mod error;
pub mod fixture;
pub mod odim;
pub mod padding;
pub mod radar;
pub mod read;

pub use bridge::convert;
pub use error::Error;
pub use odim::{open, Volume};
pub use radar::Radar;
pub use read::file::FileReader;
pub use read::io::ReadSeek;
