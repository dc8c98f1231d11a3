mod engine;
mod fixtures;
pub use engine::*;
pub use fixtures::*;

// Re-export commonly used types from plc for tests
pub use plc::{
    ClassCountMap, ExportFormat, InferenceOptions, PlcError, PredictOptions, ResultsTable,
    RowAccumulator, TaskMode, TrainingJob,
};
