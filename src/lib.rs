//! fesom-ugrid: FESOM to UGRID dataset conversion
//!
//! A Rust library for converting unstructured-mesh output of FESOM (the
//! Finite Element Sea ice-Ocean Model) to the UGRID conventions [1]. FESOM
//! stores full-depth fields on a sparse, flattened 3D node axis; UGRID
//! readers expect a dense `(time, layer, node)` grid with mesh-topology
//! attributes. The conversion is a one-shot schema remapping: dimension
//! relabeling, a masked scatter of every sparse 3D field onto NaN-filled
//! dense buffers, and attribute bookkeeping.
//!
//! ## Module Organization
//!
//! - [`dataset`]: in-memory dataset model with named dimensions
//! - [`ugrid`]: the FESOM to UGRID conversion
//! - [`netcdf_io`]: NetCDF file adapters for the dataset model
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fesom_ugrid::prelude::*;
//! use netcdf::open;
//!
//! # fn main() -> fesom_ugrid::Result<()> {
//! let data_ds = read_dataset(&open("fesom_data.nc")?)?;
//! let mesh_ds = read_dataset(&open("fesom_mesh.nc")?)?;
//!
//! let ugrid_ds = fesom_to_ugrid(&data_ds, &mesh_ds)?;
//!
//! write_dataset(&ugrid_ds, "ugrid.nc".as_ref())?;
//! # Ok(())
//! # }
//! ```
//!
//! [1]: https://ugrid-conventions.github.io/ugrid-conventions/

pub mod dataset;
pub mod errors;
pub mod netcdf_io;
pub mod ugrid;

pub use dataset::{ArcArrayD, Dataset, Values, Variable};
pub use errors::{FesomUgridError, Result};
pub use netcdf_io::{read_dataset, write_dataset, UgridWriter};
pub use ugrid::{fesom_to_ugrid, MISSING_NODE};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::dataset::{Dataset, Values, Variable};
    pub use crate::errors::{FesomUgridError, Result};
    pub use crate::netcdf_io::{read_dataset, write_dataset, UgridWriter};
    pub use crate::ugrid::fesom_to_ugrid;
}
