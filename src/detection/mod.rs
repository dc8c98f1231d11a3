pub mod summary;
pub mod ultralytics;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{ExportFormat, InferenceOptions, InferenceResult, TaskMode};

pub use summary::{SummaryError, parse_summary};
pub use ultralytics::UltralyticsCli;

/// Failures reported by a detection toolkit backend
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}: {output}")]
    Failed {
        command: String,
        status: String,
        output: String,
    },

    #[error("no detection summary reported for {0}")]
    MissingSummary(PathBuf),

    #[error("expected artifact not found: {0}")]
    MissingArtifact(PathBuf),

    #[error("{0}")]
    Other(String),
}

/// Settings handed to the toolkit for a training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainRequest {
    /// Absolute path to the dataset descriptor
    pub data: PathBuf,
    pub task: TaskMode,
    pub epochs: u32,
    pub device: String,
    pub save_dir: PathBuf,
}

/// Entry point into a detection toolkit: turns a model reference into a usable model.
pub trait DetectionEngine {
    type Model: DetectionModel;

    /// Load a model from a weights file or a named pretrained reference
    fn load(&self, model: &str) -> Result<Self::Model, EngineError>;
}

/// A loaded model. Training replaces the weights the model refers to, so a
/// subsequent [`DetectionModel::export`] exports the trained weights.
pub trait DetectionModel {
    fn infer(
        &mut self,
        image: &Path,
        options: &InferenceOptions,
    ) -> Result<InferenceResult, EngineError>;

    /// Train in place and return the path of the resulting weights
    fn train(&mut self, request: &TrainRequest) -> Result<PathBuf, EngineError>;

    /// Export the current weights and return the path of the exported artifact
    fn export(&mut self, format: ExportFormat) -> Result<PathBuf, EngineError>;
}
