use std::path::PathBuf;

use crate::detection::{DetectionEngine, DetectionModel, TrainRequest};
use crate::error::{PlcError, Result};
use crate::models::{ExportFormat, TaskMode, TrainedArtifacts};

/// Pretrained model used when no base model is given
pub const DEFAULT_BASE_MODEL: &str = "yolov8m.pt";

/// Everything needed for one training run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingJob {
    /// Dataset descriptor (YAML) understood by the toolkit
    pub data_path: PathBuf,
    pub save_dir: PathBuf,
    /// Weights file or name of a pretrained model
    pub base_model: String,
    pub task: TaskMode,
    pub epochs: u32,
    pub device: String,
    pub export_format: ExportFormat,
}

impl TrainingJob {
    pub fn new(data_path: impl Into<PathBuf>, save_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            save_dir: save_dir.into(),
            base_model: DEFAULT_BASE_MODEL.to_string(),
            task: TaskMode::Detect,
            epochs: 100,
            device: "cpu".to_string(),
            export_format: ExportFormat::Onnx,
        }
    }

    pub fn with_base_model(mut self, base_model: impl Into<String>) -> Self {
        self.base_model = base_model.into();
        self
    }

    pub fn with_task(mut self, task: TaskMode) -> Self {
        self.task = task;
        self
    }

    pub fn with_epochs(mut self, epochs: u32) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn with_export_format(mut self, export_format: ExportFormat) -> Self {
        self.export_format = export_format;
        self
    }

    /// Check the arguments without touching the toolkit
    pub fn validate(&self) -> Result<()> {
        if !self.data_path.is_file() {
            return Err(PlcError::precondition(format!(
                "dataset descriptor {} must be an existing file",
                self.data_path.display()
            )));
        }
        if self.epochs == 0 {
            return Err(PlcError::precondition("epochs must be greater than 0"));
        }
        Ok(())
    }
}

/// Train a model, then export it to the job's interchange format.
///
/// Blocks until the toolkit finishes. Toolkit failures are returned as-is and
/// leave whatever partial output the toolkit wrote in `save_dir`.
pub fn train<E: DetectionEngine>(engine: &E, job: &TrainingJob) -> Result<TrainedArtifacts> {
    job.validate()?;

    // The toolkit may change directory while training, so hand it absolute paths
    let data = std::path::absolute(&job.data_path).map_err(|e| PlcError::io(&job.data_path, e))?;
    let save_dir = std::path::absolute(&job.save_dir).map_err(|e| PlcError::io(&job.save_dir, e))?;
    std::fs::create_dir_all(&save_dir).map_err(|e| PlcError::io(&save_dir, e))?;
    log::debug!("dataset {}, saving to {}", data.display(), save_dir.display());

    println!("Training started.");

    let mut model = engine.load(&job.base_model)?;
    let weights = model.train(&TrainRequest {
        data,
        task: job.task,
        epochs: job.epochs,
        device: job.device.clone(),
        save_dir,
    })?;
    let exported = model.export(job.export_format)?;

    println!("Training completed.");

    Ok(TrainedArtifacts { weights, exported })
}
