//! FESOM to UGRID dataset conversion
//!
//! FESOM output keeps 3D fields on a sparse, flattened node axis
//! (`nodes_3d`) with a per-(layer, surface-node) index map (`nod32`) saying
//! where each dense grid cell lives in that axis, `-999` marking cells below
//! the seafloor. The UGRID conventions instead expect a dense
//! `(time, layer, node)` grid plus mesh-topology attributes
//! (`face_node_connectivity`, `node_coordinates`, `start_index`).
//!
//! [`fesom_to_ugrid`] performs that schema remapping: it merges the data and
//! mesh datasets, relabels dimensions, scatters every sparse 3D field onto a
//! NaN-filled dense buffer through the validity mask derived from `nod32`,
//! and rewrites the attributes UGRID requires.

use crate::dataset::{Dataset, Values, Variable};
use crate::errors::{FesomUgridError, Result};
use ndarray::{Array2, Array3, ArrayD, Ix2, IxDyn};
use rayon::prelude::*;

/// Sentinel in `nod32` marking a (layer, node) cell with no 3D node
pub const MISSING_NODE: i32 = -999;

/// Floating-point element type of the dense 3D buffers, taken from `u`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FloatKind {
    F32,
    F64,
}

/// Convert a FESOM data/mesh dataset pair to the UGRID conventions.
///
/// `data_ds` holds the field variables over `nodes_2d`/`nodes_3d` and the
/// `T` time dimension; `mesh_ds` holds the mesh definition (`ele`, `lon`,
/// `lat`, `nod32`). The result is a single dataset with dimensions `time`,
/// `layer` and `node`, a `mesh` descriptor variable, `start_index = 1` on
/// the element connectivity, and `mesh`/`location` attributes on every
/// node variable. Neither input is modified.
///
/// Structural defects in the inputs (missing variables or dimensions, wrong
/// dtypes, an out-of-order `nod32`) abort the conversion with a descriptive
/// error before any output is assembled.
pub fn fesom_to_ugrid(data_ds: &Dataset, mesh_ds: &Dataset) -> Result<Dataset> {
    // Validate the structural prerequisites eagerly.
    let ntime = require_dim(data_ds, "T")?;
    let float_kind = float_kind_of(data_ds.variable("u").ok_or_else(|| {
        FesomUgridError::VariableNotFound {
            var: "u".to_string(),
        }
    })?)?;

    if !data_ds
        .variables()
        .any(|v| v.has_dimension("nodes_2d") || v.has_dimension("nodes_3d"))
    {
        return Err(FesomUgridError::Generic(
            "Data dataset has no variables over 'nodes_2d' or 'nodes_3d'".to_string(),
        ));
    }

    let n2d = require_dim(mesh_ds, "nodes_2d")?;
    let nlayer = require_dim(mesh_ds, "nlayer")?;
    require_int(mesh_ds, "ele")?;
    for name in ["lon", "lat"] {
        let var = mesh_ds
            .variable(name)
            .ok_or_else(|| FesomUgridError::VariableNotFound {
                var: name.to_string(),
            })?;
        if !dims_are(var, &["nodes_2d"]) {
            return Err(FesomUgridError::ShapeMismatch {
                var: name.to_string(),
                expected: vec![n2d],
                found: var.values().shape().to_vec(),
            });
        }
    }

    // Bring the node/layer index map to (layer, node) orientation and check
    // that its valid entries enumerate the 3D node axis in order.
    let nod32_t = transposed_index_map(mesh_ds, nlayer, n2d)?;
    let n3d_valid = check_index_map_order(&nod32_t)?;
    if let Some(n3d) = data_ds.dim_len("nodes_3d") {
        if n3d != n3d_valid {
            return Err(FesomUgridError::InvalidIndexMap {
                message: format!(
                    "'nod32' has {} valid entries but dimension 'nodes_3d' has length {}",
                    n3d_valid, n3d
                ),
            });
        }
    }

    // Union of both datasets; the mesh wins on name collisions.
    let mut ds = data_ds.clone();
    ds.update(mesh_ds)?;

    // UGRID mesh descriptor: a dimensionless attribute carrier.
    {
        let mesh = ds.add_variable("mesh", &[], ArrayD::from_elem(IxDyn(&[]), 1i32))?;
        mesh.put_attribute("face_node_connectivity", "ele");
        mesh.put_attribute("node_coordinates", "lon lat");
    }

    // The connectivity in `ds` is already a copy, so stamping the indexing
    // base here leaves the caller's mesh untouched.
    let ele = ds
        .variable_mut("ele")
        .ok_or_else(|| FesomUgridError::VariableNotFound {
            var: "ele".to_string(),
        })?;
    ele.put_attribute("start_index", 1i32);

    ds.rename_dimension("nodes_2d", "node")?;
    ds.rename_dimension("nlayer", "layer")?;
    ds.rename_dimension("T", "time")?;

    // Validity mask over (layer, node); it is the same for every time step.
    let valid = nod32_t.mapv(|v| v != MISSING_NODE);

    // Scatter every sparse 3D field onto its own dense NaN-filled buffer.
    // Each variable produces an independent buffer, so this runs in
    // parallel across variables.
    let names_3d: Vec<String> = data_ds
        .variables()
        .filter(|v| {
            ds.variable(v.name())
                .map_or(false, |cur| cur.has_dimension("nodes_3d"))
        })
        .map(|v| v.name().to_string())
        .collect();

    let scattered: Vec<(String, Values)> = names_3d
        .par_iter()
        .map(|name| -> Result<(String, Values)> {
            let var = ds
                .variable(name)
                .ok_or_else(|| FesomUgridError::VariableNotFound { var: name.clone() })?;
            let flat = var.values().to_f64_vec();
            let values = match float_kind {
                FloatKind::F32 => {
                    Values::from(scatter_dense::<f32>(name, &flat, &valid, ntime, n3d_valid)?)
                }
                FloatKind::F64 => {
                    Values::from(scatter_dense::<f64>(name, &flat, &valid, ntime, n3d_valid)?)
                }
            };
            Ok((name.clone(), values))
        })
        .collect::<Result<Vec<_>>>()?;

    for (name, values) in scattered {
        let attrs = ds
            .variable(&name)
            .map(|v| v.attributes().clone())
            .unwrap_or_default();
        let var = ds.add_variable(&name, &["time", "layer", "node"], values)?;
        for (attr_name, attr_value) in attrs {
            var.put_attribute(&attr_name, attr_value);
        }
        var.put_attribute("mesh", "mesh");
        var.put_attribute("location", "node");
    }

    // Surface fields keep their values; they only gain the mesh attribution.
    for orig in data_ds.variables() {
        if names_3d.iter().any(|n| n == orig.name()) {
            continue;
        }
        if let Some(var) = ds.variable_mut(orig.name()) {
            if var.has_dimension("node") {
                var.put_attribute("mesh", "mesh");
                var.put_attribute("location", "node");
            }
        }
    }

    // FESOM writes free-text metadata as `description`; UGRID/CF readers
    // look for `long_name`.
    for orig in data_ds.variables() {
        if let Some(var) = ds.variable_mut(orig.name()) {
            if let Some(value) = var.remove_attribute("description") {
                var.put_attribute("long_name", value);
            }
        }
    }

    // The index map is an intermediate artifact, not part of the output.
    let _ = ds.remove_variable("nod32");
    if ds.has_dimension("nodes_3d") {
        ds.remove_dimension("nodes_3d")?;
    }

    ds.set_coords(&["mesh", "ele", "lon", "lat"])?;
    Ok(ds)
}

fn require_dim(ds: &Dataset, dim: &str) -> Result<usize> {
    ds.dim_len(dim)
        .ok_or_else(|| FesomUgridError::DimensionNotFound {
            dim: dim.to_string(),
        })
}

fn require_int(ds: &Dataset, name: &str) -> Result<()> {
    let var = ds
        .variable(name)
        .ok_or_else(|| FesomUgridError::VariableNotFound {
            var: name.to_string(),
        })?;
    if var.values().as_i32().is_none() {
        return Err(FesomUgridError::DtypeMismatch {
            var: name.to_string(),
            expected: "int32",
            found: var.values().dtype_name(),
        });
    }
    Ok(())
}

fn float_kind_of(var: &Variable) -> Result<FloatKind> {
    match var.values() {
        Values::F32(_) => Ok(FloatKind::F32),
        Values::F64(_) => Ok(FloatKind::F64),
        other => Err(FesomUgridError::DtypeMismatch {
            var: var.name().to_string(),
            expected: "float32 or float64",
            found: other.dtype_name(),
        }),
    }
}

fn dims_are(var: &Variable, names: &[&str]) -> bool {
    var.dimensions().len() == names.len()
        && var.dimensions().iter().zip(names).all(|(a, b)| a == b)
}

/// Owned copy of `nod32` in (layer, node) orientation
fn transposed_index_map(mesh_ds: &Dataset, nlayer: usize, n2d: usize) -> Result<Array2<i32>> {
    let var = mesh_ds
        .variable("nod32")
        .ok_or_else(|| FesomUgridError::VariableNotFound {
            var: "nod32".to_string(),
        })?;
    let arr = var
        .values()
        .as_i32()
        .ok_or_else(|| FesomUgridError::DtypeMismatch {
            var: "nod32".to_string(),
            expected: "int32",
            found: var.values().dtype_name(),
        })?;
    let view = arr.view().into_dimensionality::<Ix2>().map_err(|_| {
        FesomUgridError::ShapeMismatch {
            var: "nod32".to_string(),
            expected: vec![nlayer, n2d],
            found: var.values().shape().to_vec(),
        }
    })?;

    let map = if dims_are(var, &["nlayer", "nodes_2d"]) {
        view.to_owned()
    } else if dims_are(var, &["nodes_2d", "nlayer"]) {
        view.t().to_owned()
    } else {
        return Err(FesomUgridError::ShapeMismatch {
            var: "nod32".to_string(),
            expected: vec![nlayer, n2d],
            found: var.values().shape().to_vec(),
        });
    };

    if map.dim() != (nlayer, n2d) {
        return Err(FesomUgridError::ShapeMismatch {
            var: "nod32".to_string(),
            expected: vec![nlayer, n2d],
            found: vec![map.dim().0, map.dim().1],
        });
    }
    Ok(map)
}

/// Check that the valid entries of the (layer, node) index map, read in
/// row-major order, are exactly `0, 1, 2, ...`, which is the contract the
/// masked scatter relies on. Returns the number of valid entries.
fn check_index_map_order(map: &Array2<i32>) -> Result<usize> {
    let mut expected = 0i32;
    for &value in map.iter() {
        if value == MISSING_NODE {
            continue;
        }
        if value != expected {
            return Err(FesomUgridError::InvalidIndexMap {
                message: format!(
                    "valid entries of 'nod32' must ascend from 0 in (layer, node) order; \
                     expected {} but found {}",
                    expected, value
                ),
            });
        }
        expected += 1;
    }
    Ok(expected as usize)
}

trait DenseFloat: Copy + Send + Sync {
    const NAN: Self;
    fn from_f64(value: f64) -> Self;
}

impl DenseFloat for f32 {
    const NAN: Self = f32::NAN;
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl DenseFloat for f64 {
    const NAN: Self = f64::NAN;
    fn from_f64(value: f64) -> Self {
        value
    }
}

/// Scatter a flattened sparse 3D field onto a dense NaN-filled
/// (time, layer, node) buffer.
///
/// The mask's valid cells, walked time-major then row-major over
/// (layer, node), correspond one-to-one and in order to the flattened
/// values, so a single sequential cursor assigns every value to its cell.
fn scatter_dense<T: DenseFloat>(
    name: &str,
    flat: &[f64],
    valid: &Array2<bool>,
    ntime: usize,
    n3d: usize,
) -> Result<ArrayD<T>> {
    if flat.len() != ntime * n3d {
        return Err(FesomUgridError::ShapeMismatch {
            var: name.to_string(),
            expected: vec![ntime, n3d],
            found: vec![flat.len()],
        });
    }
    let (nlayer, nnode) = valid.dim();
    let mut out = Array3::<T>::from_elem((ntime, nlayer, nnode), T::NAN);
    let mut next = 0usize;
    for t in 0..ntime {
        for l in 0..nlayer {
            for n in 0..nnode {
                if valid[[l, n]] {
                    out[[t, l, n]] = T::from_f64(flat[next]);
                    next += 1;
                }
            }
        }
    }
    Ok(out.into_dyn())
}
