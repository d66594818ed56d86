use std::{fs, io::Cursor};

use common::config::{GcodeConfig, PipelineConfig, SeamAlignment};
use slicer::{
    builder::MeshBuilder,
    mesh::{load_mesh, Mesh},
    pipeline::{Pipeline, PipelineOutput, NESTED_PRINTPOINTS, SLICER_DATA},
    post_processing::{seams_align, simplify_paths_rdp},
    slicer::PlanarSlicer,
    Pos,
};
use tempfile::tempdir;

const CUBE_OBJ: &str = "\
v 0 0 0
v 20 0 0
v 20 20 0
v 0 20 0
v 0 0 20
v 20 0 20
v 20 20 20
v 0 20 20
f 1 4 3 2
f 5 6 7 8
f 1 2 6 5
f 2 3 7 6
f 3 4 8 7
f 4 1 5 8
";

fn cylinder() -> Mesh {
    let mut builder = MeshBuilder::new();
    builder.add_cylinder(Pos::new(50.0, 50.0, 5.0), 30.0, 60.0, 64);
    builder.build()
}

fn run(mesh: Mesh) -> PipelineOutput {
    Pipeline::new(PipelineConfig::default()).run(mesh).unwrap()
}

#[test]
fn closed_mesh_gives_ordered_layers() {
    let output = run(cylinder());
    let layers = &output.slicer.layers;

    assert_eq!(layers.len(), 7);
    let heights = layers
        .iter()
        .map(|x| x.paths[0].points[0].z)
        .collect::<Vec<_>>();
    assert!(heights.windows(2).all(|x| x[0] < x[1]));

    // Moved onto the origin before slicing.
    let (min, _) = output.slicer.mesh.bounds();
    assert!(min.z.abs() < 1e-4);
    assert!(heights[0] >= 0.0 && heights[0] < 0.1);
}

#[test]
fn nesting_matches_slicer() {
    let output = run(cylinder());
    let organizer = &output.organizer;

    assert_eq!(organizer.layer_count(), output.slicer.layers.len());
    for (layer, slice) in organizer.printpoints.iter().zip(&output.slicer.layers) {
        assert_eq!(layer.len(), slice.paths.len());
    }

    let nested = serde_json::to_value(organizer.output_nested_printpoints_dict()).unwrap();
    let nested = nested.as_object().unwrap();
    assert_eq!(nested.len(), output.slicer.layers.len());
    assert!(nested.contains_key("layer_6"));

    // Every point got its fabrication parameters.
    for point in organizer.points() {
        assert!(point.extruder_toggle.is_some());
        assert_eq!(point.velocity, Some(100.0));
        assert!(point.blend_radius.is_some());
    }

    // The print starts and ends with a lifted, non extruding point.
    let first = organizer.points().next().unwrap();
    let last = organizer.points().last().unwrap();
    assert_eq!(first.extruder_toggle, Some(false));
    assert_eq!(last.extruder_toggle, Some(false));
    assert!(first.pt.z >= 10.0);
}

#[test]
fn same_input_same_output() {
    let serialize = |output: &PipelineOutput| {
        (
            serde_json::to_string_pretty(&output.slicer.to_data()).unwrap(),
            serde_json::to_string_pretty(&output.organizer.output_nested_printpoints_dict())
                .unwrap(),
        )
    };

    let first = run(cylinder());
    let second = run(cylinder());
    assert_eq!(serialize(&first), serialize(&second));
}

#[test]
fn simplify_never_adds_points() {
    let mut builder = MeshBuilder::new();
    builder.add_cylinder(Pos::zeros(), 10.0, 30.0, 48);
    let mut result = PlanarSlicer::new(builder.build(), 3.0)
        .unwrap()
        .slice_model()
        .unwrap();
    seams_align(&mut result, SeamAlignment::YAxis);

    let before = result
        .paths()
        .map(|x| x.points.len())
        .collect::<Vec<_>>();
    simplify_paths_rdp(&mut result, 0.6);
    let after = result
        .paths()
        .map(|x| x.points.len())
        .collect::<Vec<_>>();

    assert_eq!(before.len(), after.len());
    assert!(before.iter().zip(&after).all(|(b, a)| a <= b));
    assert!(result.paths().all(|x| x.wraps()));
}

#[test]
fn obj_to_output_files() {
    let mesh = load_mesh(Cursor::new(CUBE_OBJ), "obj").unwrap();
    assert!(mesh.is_manifold());

    let mut config = PipelineConfig::default();
    config.output.gcode = Some(GcodeConfig::default());
    let output = Pipeline::new(config.clone()).run(mesh).unwrap();
    assert_eq!(output.slicer.layers.len(), 3);

    let temp = tempdir().unwrap();
    let dir = temp.path().join("output");
    let written = output.write(&dir, &config.output).unwrap();
    assert_eq!(written.len(), 4);
    assert!(written.iter().all(|x| x.is_file()));

    let raw = fs::read_to_string(dir.join(SLICER_DATA)).unwrap();
    let data = serde_json::from_str::<serde_json::Value>(&raw).unwrap();
    assert_eq!(data["layers"].as_array().unwrap().len(), 3);
    assert_eq!(data["layer_height"], 10.0);

    let raw = fs::read_to_string(dir.join(NESTED_PRINTPOINTS)).unwrap();
    let nested = serde_json::from_str::<serde_json::Value>(&raw).unwrap();
    let point = &nested["layer_1"]["path_0"]["1"];
    assert_eq!(point["extruder_toggle"], true);
    assert_eq!(point["velocity"], 100.0);
    assert_eq!(point["point"].as_array().unwrap().len(), 3);
}
