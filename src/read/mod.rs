pub mod attribute;
mod data_object;
mod data_storage;
pub mod dataset;
mod dataspace;
pub mod datatype;
mod filter_pipeline;
pub mod group;
mod group_btree;
pub mod io;
mod link;
mod local_heap;
mod message;
mod node;
pub mod object;
mod superblock;
mod symbol_table;

pub mod file;
