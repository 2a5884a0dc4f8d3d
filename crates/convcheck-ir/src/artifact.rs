//! On-disk IR artifacts.

use crate::error::{IrError, Result};
use crate::version::IrVersion;
use convcheck_core::ModelGraph;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File extension of IR artifacts.
pub const ARTIFACT_EXTENSION: &str = "ir.json";

/// Serialised form of a converted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrArtifact {
    /// Format version of the graph.
    pub ir_version: IrVersion,
    /// Tool that produced the artifact.
    pub producer: String,
    /// The IR graph.
    pub graph: ModelGraph,
}

/// Same layout with an unchecked version, so that an unsupported version is
/// reported as such rather than as a parse failure.
#[derive(Deserialize)]
struct RawArtifact {
    ir_version: u32,
    producer: String,
    graph: ModelGraph,
}

/// Handle to a converted model and the artifact backing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedModel {
    /// The IR graph.
    pub graph: ModelGraph,
    /// Format version of the graph.
    pub ir_version: IrVersion,
    /// Location of the artifact on disk.
    pub artifact_path: PathBuf,
}

impl ConvertedModel {
    /// Load a converted model from an artifact file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let artifact = read_artifact(path)?;
        Ok(Self {
            graph: artifact.graph,
            ir_version: artifact.ir_version,
            artifact_path: path.to_path_buf(),
        })
    }
}

/// Write `artifact` to `<dir>/<name>.ir.json`, creating `dir` if needed.
pub fn write_artifact(artifact: &IrArtifact, dir: &Path, name: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.{}", sanitize(name), ARTIFACT_EXTENSION));
    let json = serde_json::to_string_pretty(artifact)?;
    fs::write(&path, json)?;
    info!(
        path = %path.display(),
        ir_version = %artifact.ir_version,
        nodes = artifact.graph.node_count(),
        "IR artifact written"
    );
    Ok(path)
}

/// Read and validate an artifact.
pub fn read_artifact(path: &Path) -> Result<IrArtifact> {
    debug!(path = %path.display(), "reading IR artifact");
    let bytes = fs::read(path)?;
    let raw: RawArtifact = serde_json::from_slice(&bytes)?;
    let ir_version = IrVersion::new(raw.ir_version)?;
    raw.graph
        .validate()
        .map_err(|err| IrError::InvalidGraph(err.to_string()))?;
    Ok(IrArtifact {
        ir_version,
        producer: raw.producer,
        graph: raw.graph,
    })
}

/// Layer and model names may contain path separators.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> IrArtifact {
        IrArtifact {
            ir_version: IrVersion::LATEST,
            producer: "test".to_string(),
            graph: ModelGraph::new(),
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(&artifact(), dir.path(), "model/a").unwrap();
        assert_eq!(path.file_name().unwrap(), "model_a.ir.json");
        assert_eq!(read_artifact(&path).unwrap(), artifact());
    }

    #[test]
    fn test_unsupported_version_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.ir.json");
        let mut json = serde_json::to_value(artifact()).unwrap();
        json["ir_version"] = serde_json::json!(5);
        fs::write(&path, json.to_string()).unwrap();

        assert!(matches!(
            read_artifact(&path),
            Err(IrError::UnsupportedIrVersion { version: 5, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ConvertedModel::load(dir.path().join("absent.ir.json")),
            Err(IrError::Io(_))
        ));
    }
}
