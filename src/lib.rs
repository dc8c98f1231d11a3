pub mod detection;
pub mod error;
pub mod models;
pub mod predict;
pub mod table;
pub mod train;

pub use detection::{DetectionEngine, DetectionModel, EngineError, UltralyticsCli, parse_summary};
pub use error::PlcError;
pub use models::{ClassCountMap, ExportFormat, InferenceOptions, InferenceResult, TaskMode, TrainedArtifacts};
pub use predict::{PredictOptions, predict};
pub use table::{ResultsTable, RowAccumulator, TableRow};
pub use train::{TrainingJob, train};
