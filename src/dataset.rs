//! In-memory dataset model with named dimensions
//!
//! This module provides a small struct-of-arrays dataset abstraction:
//! variables are dtype-tagged n-dimensional arrays declared over named
//! dimensions, carrying per-variable attribute maps, plus dataset-level
//! coordinate variables and global attributes. The API surface mirrors the
//! `netcdf` crate (`add_dimension`, `add_variable`, `put_attribute`) so
//! datasets move naturally between memory and file form.
//!
//! Array buffers are stored as `ArcArray`, so cloning a `Variable` or a
//! whole `Dataset` shares buffers instead of copying them. Metadata
//! (dimension lists, attribute maps) is always deep-copied, which is what
//! keeps callers' inputs untouched when a conversion rewrites attributes.

use crate::errors::{FesomUgridError, Result};
use ndarray::{ArcArray, ArrayD, IxDyn};
use netcdf::AttributeValue;
use std::collections::HashMap;

/// Shared-ownership dynamic-dimensional array
pub type ArcArrayD<T> = ArcArray<T, IxDyn>;

/// A dtype-tagged array of variable values
#[derive(Debug, Clone)]
pub enum Values {
    F32(ArcArrayD<f32>),
    F64(ArcArrayD<f64>),
    I32(ArcArrayD<i32>),
}

impl Values {
    /// Shape of the underlying array
    pub fn shape(&self) -> &[usize] {
        match self {
            Values::F32(a) => a.shape(),
            Values::F64(a) => a.shape(),
            Values::I32(a) => a.shape(),
        }
    }

    /// Number of axes
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// Whether the array holds zero elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lowercase dtype name, matching NetCDF naming
    pub fn dtype_name(&self) -> &'static str {
        match self {
            Values::F32(_) => "float32",
            Values::F64(_) => "float64",
            Values::I32(_) => "int32",
        }
    }

    /// True for the floating-point variants
    pub fn is_float(&self) -> bool {
        matches!(self, Values::F32(_) | Values::F64(_))
    }

    /// Integer array access, if this is an integer variable
    pub fn as_i32(&self) -> Option<&ArcArrayD<i32>> {
        match self {
            Values::I32(a) => Some(a),
            _ => None,
        }
    }

    /// Float array access, if this holds f32 values
    pub fn as_f32(&self) -> Option<&ArcArrayD<f32>> {
        match self {
            Values::F32(a) => Some(a),
            _ => None,
        }
    }

    /// Float array access, if this holds f64 values
    pub fn as_f64(&self) -> Option<&ArcArrayD<f64>> {
        match self {
            Values::F64(a) => Some(a),
            _ => None,
        }
    }

    /// Row-major ravel of the values, widened to f64
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Values::F32(a) => a.iter().map(|&v| f64::from(v)).collect(),
            Values::F64(a) => a.iter().copied().collect(),
            Values::I32(a) => a.iter().map(|&v| f64::from(v)).collect(),
        }
    }
}

impl From<ArrayD<f32>> for Values {
    fn from(array: ArrayD<f32>) -> Self {
        Values::F32(array.into_shared())
    }
}

impl From<ArrayD<f64>> for Values {
    fn from(array: ArrayD<f64>) -> Self {
        Values::F64(array.into_shared())
    }
}

impl From<ArrayD<i32>> for Values {
    fn from(array: ArrayD<i32>) -> Self {
        Values::I32(array.into_shared())
    }
}

/// A named variable: dimension names, values and attributes
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    dims: Vec<String>,
    values: Values,
    attrs: HashMap<String, AttributeValue>,
}

impl Variable {
    pub(crate) fn new(name: &str, dims: &[&str], values: Values) -> Self {
        Self {
            name: name.to_string(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
            values,
            attrs: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dimension names, in axis order
    pub fn dimensions(&self) -> &[String] {
        &self.dims
    }

    /// Whether the variable is declared over the given dimension
    pub fn has_dimension(&self, dim: &str) -> bool {
        self.dims.iter().any(|d| d == dim)
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    /// All attributes of this variable
    pub fn attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.attrs
    }

    /// Look up a single attribute
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attrs.get(name)
    }

    /// String attribute access
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        match self.attrs.get(name) {
            Some(AttributeValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer attribute access
    pub fn attr_i32(&self, name: &str) -> Option<i32> {
        match self.attrs.get(name) {
            Some(AttributeValue::Int(i)) => Some(*i),
            Some(AttributeValue::Short(s)) => Some(i32::from(*s)),
            _ => None,
        }
    }

    /// Set or overwrite an attribute
    pub fn put_attribute<T: Into<AttributeValue>>(&mut self, name: &str, value: T) {
        self.attrs.insert(name.to_string(), value.into());
    }

    /// Remove an attribute, returning its value if it was present
    pub fn remove_attribute(&mut self, name: &str) -> Option<AttributeValue> {
        self.attrs.remove(name)
    }

    pub(crate) fn rename_dim(&mut self, old: &str, new: &str) {
        for dim in &mut self.dims {
            if dim == old {
                *dim = new.to_string();
            }
        }
    }
}

/// An insertion-ordered collection of variables over shared named dimensions
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    dims: Vec<(String, usize)>,
    vars: Vec<Variable>,
    coords: Vec<String>,
    attrs: HashMap<String, AttributeValue>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a dimension. Re-declaring with the same length is a no-op;
    /// a different length is a conflict.
    pub fn add_dimension(&mut self, name: &str, len: usize) -> Result<()> {
        if let Some(existing) = self.dim_len(name) {
            if existing != len {
                return Err(FesomUgridError::DimensionConflict {
                    dim: name.to_string(),
                    existing,
                    conflicting: len,
                });
            }
            return Ok(());
        }
        self.dims.push((name.to_string(), len));
        Ok(())
    }

    /// Length of a declared dimension
    pub fn dim_len(&self, name: &str) -> Option<usize> {
        self.dims
            .iter()
            .find(|(dim, _)| dim == name)
            .map(|(_, len)| *len)
    }

    pub fn has_dimension(&self, name: &str) -> bool {
        self.dim_len(name).is_some()
    }

    /// Declared dimensions in declaration order
    pub fn dimensions(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.dims.iter().map(|(name, len)| (name.as_str(), *len))
    }

    /// Add a variable over previously declared dimensions, replacing any
    /// existing variable of the same name in place (last write wins).
    /// The value shape must match the declared dimension lengths exactly.
    pub fn add_variable<V: Into<Values>>(
        &mut self,
        name: &str,
        dims: &[&str],
        values: V,
    ) -> Result<&mut Variable> {
        let values = values.into();
        let mut expected = Vec::with_capacity(dims.len());
        for dim in dims {
            let len = self
                .dim_len(dim)
                .ok_or_else(|| FesomUgridError::DimensionNotFound {
                    dim: dim.to_string(),
                })?;
            expected.push(len);
        }
        if expected != values.shape() {
            return Err(FesomUgridError::ShapeMismatch {
                var: name.to_string(),
                expected,
                found: values.shape().to_vec(),
            });
        }
        let idx = self.insert(Variable::new(name, dims, values));
        Ok(&mut self.vars[idx])
    }

    fn insert(&mut self, var: Variable) -> usize {
        match self.vars.iter().position(|v| v.name == var.name) {
            Some(idx) => {
                self.vars[idx] = var;
                idx
            }
            None => {
                self.vars.push(var);
                self.vars.len() - 1
            }
        }
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.vars.iter().find(|v| v.name == name)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.vars.iter_mut().find(|v| v.name == name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    /// All variables in insertion order
    pub fn variables(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.vars.iter()
    }

    /// Remove a variable, returning it if it was present
    pub fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        let idx = self.vars.iter().position(|v| v.name == name)?;
        self.coords.retain(|c| c != name);
        Some(self.vars.remove(idx))
    }

    /// Merge `other` into this dataset: dimensions are unioned (lengths must
    /// agree), variables and global attributes from `other` win on name
    /// collision, coordinate markers are unioned.
    pub fn update(&mut self, other: &Dataset) -> Result<()> {
        for (dim, len) in &other.dims {
            self.add_dimension(dim, *len)?;
        }
        for var in &other.vars {
            self.insert(var.clone());
        }
        for (name, value) in &other.attrs {
            self.attrs.insert(name.clone(), value.clone());
        }
        for coord in &other.coords {
            if !self.coords.contains(coord) {
                self.coords.push(coord.clone());
            }
        }
        Ok(())
    }

    /// Relabel a dimension everywhere it appears. Lengths and data are
    /// unchanged; only the name moves.
    pub fn rename_dimension(&mut self, old: &str, new: &str) -> Result<()> {
        let old_len = self
            .dim_len(old)
            .ok_or_else(|| FesomUgridError::DimensionNotFound {
                dim: old.to_string(),
            })?;
        if let Some(existing) = self.dim_len(new) {
            return Err(FesomUgridError::DimensionConflict {
                dim: new.to_string(),
                existing,
                conflicting: old_len,
            });
        }
        if let Some(entry) = self.dims.iter_mut().find(|(dim, _)| dim == old) {
            entry.0 = new.to_string();
        }
        for var in &mut self.vars {
            var.rename_dim(old, new);
        }
        Ok(())
    }

    /// Drop a declared dimension no variable references anymore
    pub fn remove_dimension(&mut self, name: &str) -> Result<()> {
        if !self.has_dimension(name) {
            return Err(FesomUgridError::DimensionNotFound {
                dim: name.to_string(),
            });
        }
        if let Some(var) = self.vars.iter().find(|v| v.has_dimension(name)) {
            return Err(FesomUgridError::Generic(format!(
                "Dimension '{}' is still referenced by variable '{}'",
                name,
                var.name()
            )));
        }
        self.dims.retain(|(dim, _)| dim != name);
        Ok(())
    }

    /// Mark existing variables as coordinate variables
    pub fn set_coords(&mut self, names: &[&str]) -> Result<()> {
        for name in names {
            if !self.has_variable(name) {
                return Err(FesomUgridError::VariableNotFound {
                    var: name.to_string(),
                });
            }
            if !self.coords.iter().any(|c| c == name) {
                self.coords.push(name.to_string());
            }
        }
        Ok(())
    }

    /// Names of the coordinate variables
    pub fn coords(&self) -> &[String] {
        &self.coords
    }

    pub fn is_coord(&self, name: &str) -> bool {
        self.coords.iter().any(|c| c == name)
    }

    /// Variables not marked as coordinates
    pub fn data_vars(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.vars.iter().filter(|v| !self.is_coord(&v.name))
    }

    /// Set or overwrite a global attribute
    pub fn add_attribute<T: Into<AttributeValue>>(&mut self, name: &str, value: T) {
        self.attrs.insert(name.to_string(), value.into());
    }

    /// Look up a global attribute
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attrs.get(name)
    }

    /// All global attributes
    pub fn attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.attrs
    }
}
