//! NetCDF adapters for the in-memory dataset model
//!
//! This module moves [`Dataset`] values between memory and NetCDF files:
//! [`read_dataset`] loads an opened file into the in-memory model, and
//! [`UgridWriter`] writes a converted dataset out with its attributes,
//! CF `coordinates` markers and a `history` stamp.
//!
//! Loading the FESOM inputs and persisting the UGRID result are the only
//! file surfaces of the crate; the conversion itself is pure.

use crate::dataset::{Dataset, Values, Variable};
use crate::errors::Result;
use chrono::Utc;
use ndarray::{ArrayD, IxDyn};
use netcdf::{create, AttributeValue, File};
use std::{fs, path::Path};

/// Read an opened NetCDF file into an in-memory [`Dataset`].
///
/// Floating-point variables keep their width (double or float); every
/// other kind is read as int32, so narrower integers widen and values of
/// wider kinds that fall outside the int32 range fail the read. Variables
/// named by a CF `coordinates` attribute are re-marked as coordinate
/// variables.
pub fn read_dataset(file: &File) -> Result<Dataset> {
    let mut ds = Dataset::new();

    for dim in file.dimensions() {
        ds.add_dimension(&dim.name(), dim.len())?;
    }

    for var in file.variables() {
        let dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

        let data_type = format!("{:?}", var.vartype()).to_lowercase();
        let values: Values = if data_type.contains("double") {
            let data: Vec<f64> = var.get_values::<f64, _>(..)?;
            ArrayD::from_shape_vec(IxDyn(&shape), data)?.into()
        } else if data_type.contains("float") {
            let data: Vec<f32> = var.get_values::<f32, _>(..)?;
            ArrayD::from_shape_vec(IxDyn(&shape), data)?.into()
        } else {
            let data: Vec<i32> = var.get_values::<i32, _>(..)?;
            ArrayD::from_shape_vec(IxDyn(&shape), data)?.into()
        };

        let dim_refs: Vec<&str> = dims.iter().map(|s| s.as_str()).collect();
        let new_var = ds.add_variable(&var.name(), &dim_refs, values)?;
        for attr in var.attributes() {
            if let Ok(value) = attr.value() {
                new_var.put_attribute(attr.name(), value);
            }
        }
    }

    for attr in file.attributes() {
        if let Ok(value) = attr.value() {
            ds.add_attribute(attr.name(), value);
        }
    }

    // Recover coordinate markers from CF `coordinates` attributes.
    let mut coord_names: Vec<String> = Vec::new();
    for var in ds.variables() {
        if let Some(coords) = var.attr_str("coordinates") {
            for name in coords.split_whitespace() {
                if ds.has_variable(name) && !coord_names.iter().any(|c| c == name) {
                    coord_names.push(name.to_string());
                }
            }
        }
    }
    let coord_refs: Vec<&str> = coord_names.iter().map(|s| s.as_str()).collect();
    ds.set_coords(&coord_refs)?;

    Ok(ds)
}

/// Writer for converted datasets
pub struct UgridWriter<'a> {
    output_path: &'a Path,
}

impl<'a> UgridWriter<'a> {
    /// Create a new writer targeting the given path
    pub fn new(output_path: &'a Path) -> Self {
        Self { output_path }
    }

    /// Write the dataset to a NetCDF file, replacing any existing file.
    ///
    /// Data variables get a CF `coordinates` attribute naming the
    /// dimensioned coordinate variables they are defined over, and a
    /// `history` global attribute records the write.
    pub fn write(&self, ds: &Dataset) -> Result<()> {
        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }

        let mut file = create(self.output_path)?;

        for (name, len) in ds.dimensions() {
            file.add_dimension(name, len)?;
        }

        for var in ds.variables() {
            let dim_refs: Vec<&str> = var.dimensions().iter().map(|s| s.as_str()).collect();
            let mut new_var = match var.values() {
                Values::F32(a) => {
                    let mut v = file.add_variable::<f32>(var.name(), &dim_refs)?;
                    v.put(a.view(), ..)?;
                    v
                }
                Values::F64(a) => {
                    let mut v = file.add_variable::<f64>(var.name(), &dim_refs)?;
                    v.put(a.view(), ..)?;
                    v
                }
                Values::I32(a) => {
                    let mut v = file.add_variable::<i32>(var.name(), &dim_refs)?;
                    v.put(a.view(), ..)?;
                    v
                }
            };

            put_attributes(&mut new_var, var)?;

            if !ds.is_coord(var.name()) {
                let coords = coordinate_names(ds, var);
                if !coords.is_empty() {
                    new_var.put_attribute("coordinates", coords.join(" "))?;
                }
            }
        }

        for (name, value) in ds.attributes() {
            file.add_attribute(name, value.clone())?;
        }

        file.add_attribute(
            "history",
            format!("Created by fesom-ugrid on {}", Utc::now().to_rfc3339()),
        )?;

        Ok(())
    }
}

/// Copy a variable's attributes into the file, skipping kinds NetCDF
/// attributes cannot represent here.
fn put_attributes(new_var: &mut netcdf::VariableMut, var: &Variable) -> Result<()> {
    for (name, value) in var.attributes() {
        match value {
            AttributeValue::Str(val) => {
                new_var.put_attribute(name, val.clone())?;
            }
            AttributeValue::Strs(vals) => {
                new_var.put_attribute(name, vals.clone())?;
            }
            AttributeValue::Float(val) => {
                new_var.put_attribute(name, *val)?;
            }
            AttributeValue::Floats(vals) => {
                new_var.put_attribute(name, vals.clone())?;
            }
            AttributeValue::Double(val) => {
                new_var.put_attribute(name, *val)?;
            }
            AttributeValue::Doubles(vals) => {
                new_var.put_attribute(name, vals.clone())?;
            }
            AttributeValue::Int(val) => {
                new_var.put_attribute(name, *val)?;
            }
            AttributeValue::Ints(vals) => {
                new_var.put_attribute(name, vals.clone())?;
            }
            AttributeValue::Short(val) => {
                new_var.put_attribute(name, *val)?;
            }
            AttributeValue::Shorts(vals) => {
                new_var.put_attribute(name, vals.clone())?;
            }
            _ => {
                println!("Skipped unsupported attribute type for '{}'", name);
            }
        }
    }
    Ok(())
}

/// Dimensioned coordinate variables whose axes are a subset of `var`'s
fn coordinate_names(ds: &Dataset, var: &Variable) -> Vec<String> {
    ds.coords()
        .iter()
        .filter(|name| name.as_str() != var.name())
        .filter(|name| {
            ds.variable(name).map_or(false, |coord| {
                coord.values().ndim() > 0
                    && coord.dimensions().iter().all(|d| var.has_dimension(d))
            })
        })
        .cloned()
        .collect()
}

/// Write a dataset to a NetCDF file at the given path
pub fn write_dataset(ds: &Dataset, output_path: &Path) -> Result<()> {
    UgridWriter::new(output_path).write(ds)
}
