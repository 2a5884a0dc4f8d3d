//! Cropping2D conversion cases.
//!
//! Each case builds a one-layer model, converts it and checks the converted
//! model against native execution on the CPU at both precisions.

use convcheck::prelude::*;
use convcheck::keras::Cropping;
use convcheck::harness::generate_inputs;
use convcheck::{EquivalenceHarness, ExecutionProvider, MismatchReport};
use convcheck_core::ModelGraph;
use convcheck_providers::create_provider;
use std::sync::Arc;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Clone)]
struct Cropping2dParams {
    cropping: Cropping<2>,
    input_names: Vec<String>,
    input_shapes: Vec<Vec<usize>>,
    input_type: DataType,
}

impl Cropping2dParams {
    fn new(cropping: impl Into<Cropping<2>>, input_shape: Vec<usize>) -> Self {
        Self {
            cropping: cropping.into(),
            input_names: vec!["x".to_string()],
            input_shapes: vec![input_shape],
            input_type: DataType::F32,
        }
    }
}

impl LayerTestParams for Cropping2dParams {
    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn input_shapes(&self) -> &[Vec<usize>] {
        &self.input_shapes
    }

    fn input_type(&self) -> DataType {
        self.input_type
    }

    fn describe(&self) -> String {
        format!("cropping={:?} shape={:?}", self.cropping, self.input_shapes[0])
    }
}

fn create_keras_cropping_2d_net(
    session: &mut FrameworkSession,
    params: &Cropping2dParams,
) -> convcheck::keras::Result<BuiltModel> {
    let x = session.input(
        &params.input_shapes[0][1..],
        params.input_type,
        &params.input_names[0],
    )?;
    let y = Cropping2D::new(params.cropping).apply(session, &x)?;
    Ok(Model::new(session, vec![x], vec![y])?.into())
}

fn scenarios() -> Vec<(Cropping2dParams, Vec<usize>)> {
    vec![
        (Cropping2dParams::new(2, vec![3, 5, 7, 5]), vec![3, 1, 3, 5]),
        (Cropping2dParams::new((1, 2), vec![2, 3, 7, 5]), vec![2, 1, 3, 5]),
        (
            Cropping2dParams::new(((2, 1), (3, 2)), vec![5, 7, 9, 7]),
            vec![5, 4, 4, 7],
        ),
    ]
}

fn run_case(params: &Cropping2dParams, config: &HarnessConfig) -> Result<()> {
    let dir = tempfile::tempdir()?;
    let report = run_equivalence_test(create_keras_cropping_2d_net, params, config, dir.path())?;
    assert_eq!(report.outputs, 1);
    assert!(report.artifact_path.starts_with(dir.path()));
    Ok(())
}

#[test]
fn test_keras_cropping_2d_fp32() -> Result<()> {
    let config = HarnessConfig::default().with_precision(Precision::FP32);
    for (params, _) in scenarios() {
        run_case(&params, &config)?;
    }
    Ok(())
}

#[test]
fn test_keras_cropping_2d_fp16() -> Result<()> {
    let config = HarnessConfig::default().with_precision(Precision::FP16);
    for (params, _) in scenarios() {
        run_case(&params, &config)?;
    }
    Ok(())
}

#[test]
fn test_keras_cropping_2d_ir_version_10() -> Result<()> {
    let config = HarnessConfig::default().with_ir_version(10);
    let (params, _) = &scenarios()[0];
    run_case(params, &config)
}

#[test]
fn test_keras_cropping_2d_output_shapes() -> Result<()> {
    for (params, expected_shape) in scenarios() {
        let mut session = FrameworkSession::new();
        let built = create_keras_cropping_2d_net(&mut session, &params)?;
        let input_shape = params.input_shapes[0].clone();
        let numel: usize = input_shape.iter().product();
        let input = Tensor::from_data(vec![0.0; numel], input_shape, DataType::F32)?;
        let outputs = built.model.predict(&[input])?;
        assert_eq!(outputs[0].shape(), expected_shape, "{}", params.describe());
    }
    Ok(())
}

#[test]
fn test_keras_cropping_2d_channels_first() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let params = Cropping2dParams::new(((1, 0), (0, 2)), vec![2, 3, 6, 5]);
    run_equivalence_test(
        |session, p: &Cropping2dParams| {
            let x = session.input(&p.input_shapes[0][1..], p.input_type, "x")?;
            let y = Cropping2D::new(p.cropping)
                .with_data_format(DataFormat::ChannelsFirst)
                .apply(session, &x)?;
            Ok(Model::new(session, vec![x], vec![y])?.into())
        },
        &params,
        &HarnessConfig::default(),
        dir.path(),
    )?;
    Ok(())
}

#[test]
fn test_keras_cropping_2d_rejects_full_crop() {
    let dir = tempfile::tempdir().unwrap();
    // 3 + 2 rows cropped from 5.
    let params = Cropping2dParams::new(((3, 2), (0, 0)), vec![1, 5, 7, 5]);
    let result = run_equivalence_test(
        create_keras_cropping_2d_net,
        &params,
        &HarnessConfig::default(),
        dir.path(),
    );
    assert!(matches!(result, Err(HarnessError::ModelConstruction(_))));
}

/// Shifts one element of the converted output by `delta`.
struct Perturbing {
    inner: Arc<dyn ExecutionProvider>,
    index: usize,
    delta: f32,
}

impl ExecutionProvider for Perturbing {
    fn device(&self) -> DeviceKind {
        self.inner.device()
    }

    fn precision(&self) -> Precision {
        self.inner.precision()
    }

    fn supports(&self, op_type: &str) -> bool {
        self.inner.supports(op_type)
    }

    fn execute(&self, graph: &ModelGraph, inputs: &[Tensor]) -> anyhow::Result<Vec<Tensor>> {
        let mut outputs = self.inner.execute(graph, inputs)?;
        let mut data = outputs[0].to_vec()?;
        data[self.index] += self.delta;
        outputs[0] = Tensor::from_data(data, outputs[0].shape(), outputs[0].dtype())?;
        Ok(outputs)
    }
}

#[test]
fn test_keras_cropping_2d_detects_perturbed_output() {
    let dir = tempfile::tempdir().unwrap();
    let (params, _) = &scenarios()[2];
    // Output is [5, 4, 4, 7]; flat index 100 is (0, 3, 2, 2).
    let provider = Arc::new(Perturbing {
        inner: create_provider(DeviceKind::Cpu, Precision::FP32).unwrap(),
        index: 100,
        delta: 1.0,
    });

    let result = EquivalenceHarness::new(HarnessConfig::default())
        .with_provider(provider)
        .run(create_keras_cropping_2d_net, params, dir.path());

    let report: MismatchReport = match result {
        Err(HarnessError::Mismatch(report)) => report,
        other => panic!("expected a mismatch, got {:?}", other),
    };
    assert_eq!(report.output_index, 0);
    assert_eq!(report.coordinate, vec![0, 3, 2, 2]);
    assert_eq!(report.offending, 1);
    assert_eq!(report.total, 5 * 4 * 4 * 7);
    assert!((report.max_abs - 1.0).abs() < 1e-6);
    assert!(report.to_string().contains("[0, 3, 2, 2]"));
}

#[test]
fn test_keras_cropping_2d_is_deterministic() -> Result<()> {
    let (params, _) = &scenarios()[1];
    let config = HarnessConfig::default().with_seed(1234);

    let first = tempfile::tempdir()?;
    let second = tempfile::tempdir()?;
    let a = run_equivalence_test(create_keras_cropping_2d_net, params, &config, first.path())?;
    let b = run_equivalence_test(create_keras_cropping_2d_net, params, &config, second.path())?;

    assert_eq!(std::fs::read(&a.artifact_path)?, std::fs::read(&b.artifact_path)?);
    assert_eq!(a.compared_elements, b.compared_elements);
    assert_eq!(a.max_abs_deviation, b.max_abs_deviation);
    assert_eq!(a.stage, b.stage);

    // Same seed, same inputs, same native outputs.
    let mut outputs = Vec::new();
    for _ in 0..2 {
        let mut session = FrameworkSession::new();
        let built = create_keras_cropping_2d_net(&mut session, params)?;
        let inputs = generate_inputs(&params.input_specs(), config.seed)?;
        let predicted = built.model.predict(&inputs)?;
        outputs.push(predicted[0].to_vec()?);
    }
    assert_eq!(outputs[0], outputs[1]);
    Ok(())
}
