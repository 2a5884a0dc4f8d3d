//! The equivalence pipeline: build, convert, run both sides, compare.

use crate::compare::{compare_outputs, Tolerance};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::inputs::generate_inputs;
use crate::params::{check_params, check_params_against_model, LayerTestParams};
use crate::reference::StructuralReference;
use convcheck_core::{DeviceKind, Precision};
use convcheck_ir::{ConversionOptions, ConvertedModel, IrConverter, IrVersion, ModelConverter};
use convcheck_keras::{FrameworkSession, Model};
use convcheck_providers::{ExecutionProvider, ProviderRegistry};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn};

/// Progress of one case. Each stage is reached in order; a failure leaves
/// the case at the last stage it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Nothing done yet.
    Pending,
    /// Native model built and checked against the parameters.
    Built,
    /// Artifact written and re-read.
    Converted,
    /// Native outputs computed.
    ExecutedNative,
    /// Converted outputs computed.
    ExecutedConverted,
    /// Outputs and structure compared.
    Compared,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Pending => "pending",
            Stage::Built => "built",
            Stage::Converted => "converted",
            Stage::ExecutedNative => "executed_native",
            Stage::ExecutedConverted => "executed_converted",
            Stage::Compared => "compared",
        };
        f.write_str(name)
    }
}

/// What the model-building callback returns.
#[derive(Debug, Clone)]
pub struct BuiltModel {
    /// The native model.
    pub model: Model,
    /// Optional expected structure of the converted graph.
    pub reference: Option<StructuralReference>,
}

impl BuiltModel {
    /// Attach a structural reference.
    pub fn with_reference(mut self, reference: StructuralReference) -> Self {
        self.reference = Some(reference);
        self
    }
}

impl From<Model> for BuiltModel {
    fn from(model: Model) -> Self {
        Self {
            model,
            reference: None,
        }
    }
}

/// Outcome of a passing case.
#[derive(Debug, Clone)]
pub struct EquivalenceReport {
    /// Case label from the parameters.
    pub case: String,
    /// Device the converted model ran on.
    pub device: DeviceKind,
    /// Precision the converted model ran at.
    pub precision: Precision,
    /// IR version of the artifact.
    pub ir_version: IrVersion,
    /// Where the artifact was written.
    pub artifact_path: PathBuf,
    /// Last stage reached; [`Stage::Compared`] for a pass.
    pub stage: Stage,
    /// Number of outputs compared.
    pub outputs: usize,
    /// Number of elements compared.
    pub compared_elements: usize,
    /// Largest absolute deviation observed.
    pub max_abs_deviation: f32,
    /// Tolerance applied.
    pub tolerance: Tolerance,
    /// Whether a structural reference was checked.
    pub structure_checked: bool,
    /// Wall time of the case.
    pub elapsed: Duration,
}

enum ProviderSource {
    Registry(Arc<ProviderRegistry>),
    Fixed(Arc<dyn ExecutionProvider>),
}

/// Runs equivalence cases with a fixed configuration and collaborators.
pub struct EquivalenceHarness {
    config: HarnessConfig,
    converter: Box<dyn ModelConverter>,
    providers: ProviderSource,
}

impl EquivalenceHarness {
    /// Harness with the built-in converter and a private provider registry.
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            converter: Box::new(IrConverter::new()),
            providers: ProviderSource::Registry(Arc::new(ProviderRegistry::new())),
        }
    }

    /// Replace the converter.
    pub fn with_converter(mut self, converter: impl ModelConverter + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    /// Run converted models on `provider` instead of one from a registry.
    pub fn with_provider(mut self, provider: Arc<dyn ExecutionProvider>) -> Self {
        self.providers = ProviderSource::Fixed(provider);
        self
    }

    /// Share a provider registry with other harnesses.
    pub fn with_registry(mut self, registry: Arc<ProviderRegistry>) -> Self {
        self.providers = ProviderSource::Registry(registry);
        self
    }

    /// Harness configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run one case, writing the artifact under `temp_dir`.
    pub fn run<P, F>(&self, build_model: F, params: &P, temp_dir: &Path) -> Result<EquivalenceReport>
    where
        P: LayerTestParams + ?Sized,
        F: FnOnce(&mut FrameworkSession, &P) -> convcheck_keras::Result<BuiltModel>,
    {
        let case = params.describe();
        let span = info_span!(
            "equivalence_case",
            case = %case,
            device = %self.config.device,
            precision = %self.config.precision,
            ir_version = self.config.ir_version,
            temp_dir = %temp_dir.display()
        );
        let _guard = span.enter();

        let start = Instant::now();
        let mut stage = Stage::Pending;
        match self.run_stages(build_model, params, temp_dir, &mut stage) {
            Ok(mut report) => {
                report.case = case;
                report.elapsed = start.elapsed();
                info!(
                    elements = report.compared_elements,
                    max_abs = report.max_abs_deviation,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "case passed"
                );
                Ok(report)
            }
            Err(err) => {
                warn!(stage = %stage, kind = err.kind(), error = %err, "case failed");
                Err(err)
            }
        }
    }

    fn run_stages<P, F>(
        &self,
        build_model: F,
        params: &P,
        temp_dir: &Path,
        stage: &mut Stage,
    ) -> Result<EquivalenceReport>
    where
        P: LayerTestParams + ?Sized,
        F: FnOnce(&mut FrameworkSession, &P) -> convcheck_keras::Result<BuiltModel>,
    {
        check_params(params)?;

        // The session lives exactly as long as the case.
        let mut session = FrameworkSession::new();
        let BuiltModel { model, reference } = build_model(&mut session, params)?;
        check_params_against_model(params, &model)?;
        *stage = Stage::Built;
        debug!(model = %model.name(), layers = model.layers().len(), "native model built");

        let ir_version = IrVersion::new(self.config.ir_version)?;
        let options =
            ConversionOptions::new(ir_version).with_input_shapes(params.input_shapes().to_vec());
        let written = self.converter.convert(&model, &options, temp_dir)?;
        let converted = ConvertedModel::load(&written.artifact_path)?;
        *stage = Stage::Converted;

        let inputs = generate_inputs(&params.input_specs(), self.config.seed).map_err(|e| {
            HarnessError::Precondition(format!("cannot generate inputs: {}", e))
        })?;

        let expected = model
            .predict(&inputs)
            .map_err(|e| HarnessError::Execution {
                stage: Stage::ExecutedNative,
                source: e.into(),
            })?;
        *stage = Stage::ExecutedNative;

        let provider = self.provider()?;
        let actual = provider
            .execute(&converted.graph, &inputs)
            .map_err(|source| HarnessError::Execution {
                stage: Stage::ExecutedConverted,
                source,
            })?;
        *stage = Stage::ExecutedConverted;

        let names: Vec<String> = model.outputs().iter().map(|t| t.name.clone()).collect();
        let tolerance = self.config.effective_tolerance();
        let summary = compare_outputs(&expected, &actual, &names, tolerance)?;
        if let Some(reference) = &reference {
            reference.check(&converted.graph)?;
        }
        *stage = Stage::Compared;

        if !self.config.keep_artifacts {
            std::fs::remove_file(&converted.artifact_path)?;
        }
        drop(session);

        Ok(EquivalenceReport {
            case: String::new(),
            device: provider.device(),
            precision: provider.precision(),
            ir_version,
            artifact_path: converted.artifact_path,
            stage: *stage,
            outputs: summary.outputs,
            compared_elements: summary.elements,
            max_abs_deviation: summary.max_abs,
            tolerance,
            structure_checked: reference.is_some(),
            elapsed: Duration::ZERO,
        })
    }

    fn provider(&self) -> Result<Arc<dyn ExecutionProvider>> {
        match &self.providers {
            ProviderSource::Fixed(provider) => Ok(provider.clone()),
            ProviderSource::Registry(registry) => registry
                .get_or_create(self.config.device, self.config.precision)
                .map_err(|e| HarnessError::DeviceUnavailable {
                    device: self.config.device,
                    reason: e.to_string(),
                }),
        }
    }
}

impl fmt::Debug for EquivalenceHarness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EquivalenceHarness")
            .field("config", &self.config)
            .field("converter", &self.converter.name())
            .finish()
    }
}

/// Run one equivalence case with the built-in collaborators.
///
/// # Example
///
/// ```rust
/// use convcheck_core::DataType;
/// use convcheck_harness::{run_equivalence_test, HarnessConfig, LayerTestParams};
/// use convcheck_keras::{Cropping2D, Model};
///
/// #[derive(Debug)]
/// struct Params {
///     names: Vec<String>,
///     shapes: Vec<Vec<usize>>,
/// }
///
/// impl LayerTestParams for Params {
///     fn input_names(&self) -> &[String] {
///         &self.names
///     }
///     fn input_shapes(&self) -> &[Vec<usize>] {
///         &self.shapes
///     }
/// }
///
/// let params = Params {
///     names: vec!["x".to_string()],
///     shapes: vec![vec![3, 5, 7, 5]],
/// };
/// let dir = std::env::temp_dir().join("convcheck-doc");
/// let report = run_equivalence_test(
///     |session, p: &Params| {
///         let shape = &p.input_shapes()[0][1..];
///         let x = session.input(shape, DataType::F32, &p.input_names()[0])?;
///         let y = Cropping2D::new(2).apply(session, &x)?;
///         Ok(Model::new(session, vec![x], vec![y])?.into())
///     },
///     &params,
///     &HarnessConfig::default(),
///     &dir,
/// )?;
/// assert_eq!(report.outputs, 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn run_equivalence_test<P, F>(
    build_model: F,
    params: &P,
    config: &HarnessConfig,
    temp_dir: &Path,
) -> Result<EquivalenceReport>
where
    P: LayerTestParams + ?Sized,
    F: FnOnce(&mut FrameworkSession, &P) -> convcheck_keras::Result<BuiltModel>,
{
    EquivalenceHarness::new(config.clone()).run(build_model, params, temp_dir)
}
