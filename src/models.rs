use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Class name (singular) to number of detected objects, for one image.
pub type ClassCountMap = BTreeMap<String, u32>;

/// Training task understood by the detection toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TaskMode {
    #[default]
    Detect,
    Segment,
    Classify,
    Pose,
    Obb,
}

impl TaskMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskMode::Detect => "detect",
            TaskMode::Segment => "segment",
            TaskMode::Classify => "classify",
            TaskMode::Pose => "pose",
            TaskMode::Obb => "obb",
        }
    }
}

impl fmt::Display for TaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interchange format that trained weights are exported to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Onnx,
    Torchscript,
    Openvino,
    Engine,
    Coreml,
    Tflite,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Onnx => "onnx",
            ExportFormat::Torchscript => "torchscript",
            ExportFormat::Openvino => "openvino",
            ExportFormat::Engine => "engine",
            ExportFormat::Coreml => "coreml",
            ExportFormat::Tflite => "tflite",
        }
    }

    /// Path suffix the toolkit gives the exported artifact, relative to the weights file stem.
    /// OpenVINO exports a directory rather than a single file.
    pub fn artifact_suffix(&self) -> &'static str {
        match self {
            ExportFormat::Onnx => ".onnx",
            ExportFormat::Torchscript => ".torchscript",
            ExportFormat::Openvino => "_openvino_model",
            ExportFormat::Engine => ".engine",
            ExportFormat::Coreml => ".mlpackage",
            ExportFormat::Tflite => ".tflite",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed policy applied to every inference call of a predict run
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOptions {
    pub confidence: f32,
    pub image_size: u32,
    pub show_labels: bool,
    /// Directory that receives the annotated copy of the image (None = don't save).
    /// The same directory is reused across a run and may already exist.
    pub save_dir: Option<PathBuf>,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            confidence: 0.2,
            image_size: 1280,
            show_labels: false,
            save_dir: None,
        }
    }
}

/// What an inference call reports back for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceResult {
    /// Human-readable summary such as `2 cars, 1 person,`
    pub summary: String,
    /// Location of the annotated image, when one was saved
    pub annotated: Option<PathBuf>,
}

impl InferenceResult {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            annotated: None,
        }
    }
}

/// Files produced by a successful training run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainedArtifacts {
    pub weights: PathBuf,
    pub exported: PathBuf,
}
