//! Centralized error handling for fesom-ugrid
//!
//! This module provides structured error types for the conversion pipeline,
//! distinguishing schema defects in the input datasets from dtype problems
//! and from plain NetCDF/array failures.

use std::fmt;

/// Main error type for fesom-ugrid operations
#[derive(Debug)]
pub enum FesomUgridError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Required variable absent from a dataset
    VariableNotFound { var: String },

    /// Required dimension absent from a dataset
    DimensionNotFound { dim: String },

    /// A dimension name declared twice with different lengths
    DimensionConflict {
        dim: String,
        existing: usize,
        conflicting: usize,
    },

    /// Variable shape disagrees with its declared dimensions
    ShapeMismatch {
        var: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// Variable has the wrong element type for its role
    DtypeMismatch {
        var: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The node/layer index map violates the ascending-order contract
    InvalidIndexMap { message: String },

    /// Generic error for miscellaneous contexts
    Generic(String),
}

impl fmt::Display for FesomUgridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FesomUgridError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            FesomUgridError::IoError(e) => write!(f, "I/O error: {}", e),
            FesomUgridError::ArrayError(e) => write!(f, "Array error: {}", e),
            FesomUgridError::VariableNotFound { var } => {
                write!(f, "Variable '{}' not found in dataset", var)
            }
            FesomUgridError::DimensionNotFound { dim } => {
                write!(f, "Dimension '{}' not found in dataset", dim)
            }
            FesomUgridError::DimensionConflict {
                dim,
                existing,
                conflicting,
            } => write!(
                f,
                "Dimension '{}' declared with length {} but already has length {}",
                dim, conflicting, existing
            ),
            FesomUgridError::ShapeMismatch {
                var,
                expected,
                found,
            } => write!(
                f,
                "Variable '{}' has shape {:?}, expected {:?}",
                var, found, expected
            ),
            FesomUgridError::DtypeMismatch {
                var,
                expected,
                found,
            } => write!(
                f,
                "Variable '{}' has dtype {}, expected {}",
                var, found, expected
            ),
            FesomUgridError::InvalidIndexMap { message } => {
                write!(f, "Invalid node index map: {}", message)
            }
            FesomUgridError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FesomUgridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FesomUgridError::NetCDFError(e) => Some(e),
            FesomUgridError::IoError(e) => Some(e),
            FesomUgridError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for FesomUgridError {
    fn from(error: netcdf::Error) -> Self {
        FesomUgridError::NetCDFError(error)
    }
}

impl From<std::io::Error> for FesomUgridError {
    fn from(error: std::io::Error) -> Self {
        FesomUgridError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for FesomUgridError {
    fn from(error: ndarray::ShapeError) -> Self {
        FesomUgridError::ArrayError(error)
    }
}

impl From<String> for FesomUgridError {
    fn from(error: String) -> Self {
        FesomUgridError::Generic(error)
    }
}

impl From<&str> for FesomUgridError {
    fn from(error: &str) -> Self {
        FesomUgridError::Generic(error.to_string())
    }
}

/// Result type alias for fesom-ugrid operations
pub type Result<T> = std::result::Result<T, FesomUgridError>;
