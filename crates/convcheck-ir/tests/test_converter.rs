//! Unit tests for lowering native models into IR artifacts
//! Tests: graph structure, shape handling, artifact files, rejection paths

use convcheck_core::{DataType, NodeAttribute, Tensor};
use convcheck_ir::{
    read_artifact, ConversionOptions, IrConverter, IrError, IrVersion, ModelConverter,
    OperatorRegistry, PRODUCER_NAME,
};
use convcheck_keras::{Cropping2D, Cropping3D, DataFormat, FrameworkSession, Lambda, Model};

fn cropping2d_model(cropping: ((usize, usize), (usize, usize)), shape: &[usize]) -> Model {
    let mut session = FrameworkSession::new();
    let x = session.input(shape, DataType::F32, "x").unwrap();
    let y = Cropping2D::new(cropping).apply(&mut session, &x).unwrap();
    Model::new(&mut session, vec![x], vec![y]).unwrap()
}

// ============ Lowering Tests ============

#[test]
fn test_cropping2d_lowers_to_single_slice() {
    let model = cropping2d_model(((2, 1), (3, 2)), &[7, 9, 7]);
    let graph = IrConverter::new()
        .lower(&model, &ConversionOptions::default())
        .unwrap();

    assert_eq!(graph.node_count(), 1);
    let node = &graph.nodes()[0];
    assert_eq!(node.op_type, "Slice");
    assert_eq!(node.name.as_deref(), Some("cropping2d"));
    assert_eq!(
        node.attributes.get("starts"),
        Some(&NodeAttribute::IntArray(vec![2, 3]))
    );
    assert_eq!(
        node.attributes.get("ends"),
        Some(&NodeAttribute::IntArray(vec![-1, -2]))
    );
    assert_eq!(
        node.attributes.get("axes"),
        Some(&NodeAttribute::IntArray(vec![1, 2]))
    );
    assert_eq!(graph.metadata.get("producer").map(String::as_str), Some(PRODUCER_NAME));
}

#[test]
fn test_dynamic_batch_without_overrides() {
    let model = cropping2d_model(((2, 2), (2, 2)), &[5, 7, 5]);
    let graph = IrConverter::new()
        .lower(&model, &ConversionOptions::default())
        .unwrap();
    assert_eq!(graph.inputs[0].shape, vec![0, 5, 7, 5]);
    assert_eq!(graph.outputs[0].shape, vec![0, 1, 3, 5]);
}

#[test]
fn test_static_shapes_with_overrides() {
    let model = cropping2d_model(((2, 2), (2, 2)), &[5, 7, 5]);
    let options = ConversionOptions::default().with_input_shapes(vec![vec![3, 5, 7, 5]]);
    let graph = IrConverter::new().lower(&model, &options).unwrap();
    assert_eq!(graph.inputs[0].shape, vec![3, 5, 7, 5]);
    assert_eq!(graph.outputs[0].shape, vec![3, 1, 3, 5]);
}

#[test]
fn test_mismatched_override_rejected() {
    let model = cropping2d_model(((1, 1), (1, 1)), &[5, 7, 5]);
    let wrong_dims = ConversionOptions::default().with_input_shapes(vec![vec![3, 5, 8, 5]]);
    assert!(matches!(
        IrConverter::new().lower(&model, &wrong_dims),
        Err(IrError::InvalidInputShape(_))
    ));

    let wrong_count =
        ConversionOptions::default().with_input_shapes(vec![vec![3, 5, 7, 5], vec![1, 2]]);
    assert!(matches!(
        IrConverter::new().lower(&model, &wrong_count),
        Err(IrError::InvalidInputShape(_))
    ));
}

#[test]
fn test_channels_first_axes() {
    let mut session = FrameworkSession::new();
    let x = session.input(&[2, 6, 6, 6], DataType::F32, "x").unwrap();
    let y = Cropping3D::new(1)
        .with_data_format(DataFormat::ChannelsFirst)
        .apply(&mut session, &x)
        .unwrap();
    let model = Model::new(&mut session, vec![x], vec![y]).unwrap();

    let graph = IrConverter::new()
        .lower(&model, &ConversionOptions::default())
        .unwrap();
    assert_eq!(
        graph.nodes()[0].attributes.get("axes"),
        Some(&NodeAttribute::IntArray(vec![2, 3, 4]))
    );
}

#[test]
fn test_lambda_is_unsupported() {
    let mut session = FrameworkSession::new();
    let x = session.input(&[4, 4, 1], DataType::F32, "x").unwrap();
    let h = Lambda::new(|t: &Tensor| Ok(t.clone()))
        .apply(&mut session, &x)
        .unwrap();
    let y = Cropping2D::new(1).apply(&mut session, &h).unwrap();
    let model = Model::new(&mut session, vec![x], vec![y]).unwrap();

    let err = IrConverter::new()
        .lower(&model, &ConversionOptions::default())
        .unwrap_err();
    match err {
        IrError::UnsupportedLayer { layer, class_name } => {
            assert_eq!(layer, "lambda");
            assert_eq!(class_name, "Lambda");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_registry_without_slice_rejects_cropping() {
    let converter = IrConverter::with_registry(OperatorRegistry::empty());
    let model = cropping2d_model(((1, 1), (1, 1)), &[4, 4, 1]);
    assert!(matches!(
        converter.lower(&model, &ConversionOptions::default()),
        Err(IrError::UnsupportedOperator { .. })
    ));
}

// ============ Artifact Tests ============

#[test]
fn test_convert_writes_readable_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let model = cropping2d_model(((1, 2), (1, 2)), &[6, 8, 3]);
    let options = ConversionOptions::new(IrVersion::new(10).unwrap());

    let converted = IrConverter::new()
        .convert(&model, &options, dir.path())
        .unwrap();
    assert!(converted.artifact_path.starts_with(dir.path()));
    assert_eq!(converted.ir_version.get(), 10);

    let artifact = read_artifact(&converted.artifact_path).unwrap();
    assert_eq!(artifact.graph, converted.graph);
    assert_eq!(artifact.producer, PRODUCER_NAME);
}

#[test]
fn test_conversion_is_byte_stable() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let options = ConversionOptions::default().with_input_shapes(vec![vec![2, 3, 7, 5]]);

    let a = IrConverter::new()
        .convert(&cropping2d_model(((1, 1), (2, 2)), &[3, 7, 5]), &options, first.path())
        .unwrap();
    let b = IrConverter::new()
        .convert(&cropping2d_model(((1, 1), (2, 2)), &[3, 7, 5]), &options, second.path())
        .unwrap();

    assert_eq!(
        std::fs::read(&a.artifact_path).unwrap(),
        std::fs::read(&b.artifact_path).unwrap()
    );
}
