//! NetCDF round-trip and end-to-end conversion tests

use fesom_ugrid::{fesom_to_ugrid, read_dataset, write_dataset, Dataset, MISSING_NODE};
use ndarray::{Array1, Array2, ArrayD, IxDyn};
use netcdf::open;
use tempfile::tempdir;

#[test]
fn test_write_read_round_trip() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("round_trip.nc");

    let mut ds = Dataset::new();
    ds.add_dimension("x", 2).unwrap();
    ds.add_dimension("y", 3).unwrap();

    let lon = Array1::from(vec![10.0f64, 20.0]).into_dyn();
    ds.add_variable("lon", &["x"], lon).unwrap();

    let field = Array2::from_shape_vec((2, 3), vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0])
        .unwrap()
        .into_dyn();
    let var = ds.add_variable("field", &["x", "y"], field).unwrap();
    var.put_attribute("units", "m");
    var.put_attribute("count", 7i32);

    let scalar = ArrayD::from_elem(IxDyn(&[]), 1i32);
    ds.add_variable("marker", &[], scalar).unwrap();

    ds.set_coords(&["lon"]).unwrap();
    ds.add_attribute("title", "Round trip");

    write_dataset(&ds, &file_path).unwrap();

    let file = open(&file_path).unwrap();
    let read = read_dataset(&file).unwrap();

    assert_eq!(read.dim_len("x"), Some(2));
    assert_eq!(read.dim_len("y"), Some(3));

    let field = read.variable("field").unwrap();
    assert_eq!(field.dimensions(), &["x", "y"]);
    assert_eq!(field.attr_str("units"), Some("m"));
    assert_eq!(field.attr_i32("count"), Some(7));
    let values = field.values().as_f32().unwrap();
    assert_eq!(
        values.iter().copied().collect::<Vec<f32>>(),
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
    );

    let marker = read.variable("marker").unwrap();
    assert_eq!(marker.values().ndim(), 0);
    assert_eq!(marker.values().to_f64_vec(), vec![1.0]);

    // The coordinate marker survives through the CF `coordinates` attribute.
    assert_eq!(field.attr_str("coordinates"), Some("lon"));
    assert!(read.is_coord("lon"));

    match read.attribute("title") {
        Some(netcdf::AttributeValue::Str(s)) => assert_eq!(s, "Round trip"),
        _ => panic!("Expected a string title attribute"),
    }
    assert!(read.attribute("history").is_some());
}

fn fesom_fixture() -> (Dataset, Dataset) {
    let mut mesh = Dataset::new();
    mesh.add_dimension("nodes_2d", 4).unwrap();
    mesh.add_dimension("nlayer", 2).unwrap();
    mesh.add_dimension("elements", 3).unwrap();
    mesh.add_dimension("three", 3).unwrap();

    let ele = Array2::from_shape_vec((3, 3), vec![1, 2, 3, 2, 3, 4, 1, 3, 4])
        .unwrap()
        .into_dyn();
    mesh.add_variable("ele", &["elements", "three"], ele).unwrap();
    let lon = Array1::from(vec![0.0f64, 1.0, 2.0, 3.0]).into_dyn();
    mesh.add_variable("lon", &["nodes_2d"], lon).unwrap();
    let lat = Array1::from(vec![50.0f64, 51.0, 52.0, 53.0]).into_dyn();
    mesh.add_variable("lat", &["nodes_2d"], lat).unwrap();
    let nod32 = Array2::from_shape_vec((2, 4), vec![0, 1, 2, 3, 4, 5, MISSING_NODE, MISSING_NODE])
        .unwrap()
        .into_dyn();
    mesh.add_variable("nod32", &["nlayer", "nodes_2d"], nod32)
        .unwrap();

    let mut data = Dataset::new();
    data.add_dimension("T", 1).unwrap();
    data.add_dimension("nodes_3d", 6).unwrap();

    let u = Array2::from_shape_vec((1, 6), vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0])
        .unwrap()
        .into_dyn();
    data.add_variable("u", &["T", "nodes_3d"], u).unwrap();
    let temp = Array2::from_shape_vec((1, 6), vec![10.0f32, 20.0, 30.0, 40.0, 50.0, 60.0])
        .unwrap()
        .into_dyn();
    let var = data.add_variable("temp", &["T", "nodes_3d"], temp).unwrap();
    var.put_attribute("description", "temperature");

    (data, mesh)
}

#[test]
fn test_conversion_pipeline_to_file() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("ugrid.nc");

    let (data, mesh) = fesom_fixture();
    let ugrid = fesom_to_ugrid(&data, &mesh).unwrap();
    write_dataset(&ugrid, &file_path).unwrap();

    let file = open(&file_path).unwrap();

    // UGRID dimensions on disk.
    for (name, len) in [("time", 1), ("layer", 2), ("node", 4)] {
        let dim = file
            .dimensions()
            .find(|d| d.name() == name)
            .unwrap_or_else(|| panic!("dimension '{}' missing", name));
        assert_eq!(dim.len(), len);
    }
    assert!(file.dimensions().all(|d| d.name() != "nodes_3d"));
    assert!(file.variable("nod32").is_none());

    // Mesh topology attribute schema.
    let mesh_var = file.variable("mesh").expect("mesh variable missing");
    match mesh_var.attribute("face_node_connectivity").unwrap().value() {
        Ok(netcdf::AttributeValue::Str(s)) => assert_eq!(s, "ele"),
        _ => panic!("Expected face_node_connectivity string"),
    }
    match mesh_var.attribute("node_coordinates").unwrap().value() {
        Ok(netcdf::AttributeValue::Str(s)) => assert_eq!(s, "lon lat"),
        _ => panic!("Expected node_coordinates string"),
    }

    let ele = file.variable("ele").expect("ele variable missing");
    match ele.attribute("start_index").unwrap().value() {
        Ok(netcdf::AttributeValue::Int(i)) => assert_eq!(i, 1),
        _ => panic!("Expected integer start_index"),
    }

    // Scattered field on disk: first six cells valid, the rest NaN.
    let temp = file.variable("temp").expect("temp variable missing");
    let dims: Vec<String> = temp
        .dimensions()
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    assert_eq!(dims, vec!["time", "layer", "node"]);

    let values: Vec<f32> = temp.get_values::<f32, _>(..).unwrap();
    assert_eq!(values.len(), 8);
    assert_eq!(&values[..6], &[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
    assert!(values[6].is_nan());
    assert!(values[7].is_nan());

    match temp.attribute("mesh").unwrap().value() {
        Ok(netcdf::AttributeValue::Str(s)) => assert_eq!(s, "mesh"),
        _ => panic!("Expected mesh attribute"),
    }
    match temp.attribute("location").unwrap().value() {
        Ok(netcdf::AttributeValue::Str(s)) => assert_eq!(s, "node"),
        _ => panic!("Expected location attribute"),
    }
    match temp.attribute("long_name").unwrap().value() {
        Ok(netcdf::AttributeValue::Str(s)) => assert_eq!(s, "temperature"),
        _ => panic!("Expected long_name attribute"),
    }
    assert!(temp.attribute("description").is_none());

    // Data variables point at the node coordinates.
    match temp.attribute("coordinates").unwrap().value() {
        Ok(netcdf::AttributeValue::Str(s)) => assert_eq!(s, "lon lat"),
        _ => panic!("Expected coordinates attribute"),
    }
}

#[test]
fn test_file_backed_conversion() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let data_path = temp_dir.path().join("data.nc");
    let mesh_path = temp_dir.path().join("mesh.nc");

    let (data, mesh) = fesom_fixture();
    write_dataset(&data, &data_path).unwrap();
    write_dataset(&mesh, &mesh_path).unwrap();

    // Conversion behaves the same whether inputs come from memory or files.
    let data_read = read_dataset(&open(&data_path).unwrap()).unwrap();
    let mesh_read = read_dataset(&open(&mesh_path).unwrap()).unwrap();
    let ugrid = fesom_to_ugrid(&data_read, &mesh_read).unwrap();

    let temp = ugrid.variable("temp").unwrap();
    assert_eq!(temp.dimensions(), &["time", "layer", "node"]);
    let dense = temp.values().as_f32().unwrap();
    assert_eq!(dense[[0, 0, 0]], 10.0);
    assert_eq!(dense[[0, 1, 1]], 60.0);
    assert!(dense[[0, 1, 3]].is_nan());
}
