//! In-memory group/variable tree for hierarchical scientific data files.
//!
//! This crate models a NetCDF-4/HDF5 file as a flat table of nodes keyed by
//! absolute path (`/`, `/group`, `/group/variable`). Groups declare
//! dimensions; variables reference them by name and hold their values as
//! `f64` alongside a [`DataType`]. Every node carries an attribute table
//! accessed through the [`AttributeStore`] trait.
//!
//! # Engines
//!
//! A [`TreeEngine`] loads a file into a [`Tree`] and writes a tree out as a
//! new file. [`JsonEngine`] handles JSON snapshots and is always available.
//! The native NetCDF engine needs the `netcdf` feature and the system
//! libraries `libhdf5-dev` and `libnetcdf-dev`.

pub mod engine;
pub mod error;
#[cfg(feature = "netcdf")]
pub mod native;
pub mod path;
pub mod tree;
pub mod types;
pub mod value;

pub use engine::{engine_for_path, write_atomically, JsonEngine, TreeEngine};
pub use error::{TreeError, TreeResult};
#[cfg(feature = "netcdf")]
pub use native::{silence_hdf5_errors, NetCdfEngine};
pub use tree::{GroupData, Node, NodeKind, Tree, VariableData};
pub use types::DataType;
pub use value::{AttributeStore, AttributeValue};
