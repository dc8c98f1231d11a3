use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use plc::detection::TrainRequest;
use plc::{
    DetectionEngine, DetectionModel, EngineError, ExportFormat, InferenceOptions, InferenceResult,
};

/// Every call the scripted engine received, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(String),
    Infer(PathBuf, InferenceOptions),
    Train(TrainRequest),
    Export(ExportFormat),
}

/// In-memory engine that answers with canned summaries and records its calls.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    calls: Rc<RefCell<Vec<Call>>>,
    summaries: HashMap<String, String>,
    fail_on: Option<String>,
    fail_training: bool,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summary reported for the image called `file` (default: no detections)
    pub fn with_summary(mut self, file: &str, summary: &str) -> Self {
        self.summaries.insert(file.to_string(), summary.to_string());
        self
    }

    /// Make inference on `file` fail
    pub fn failing_on(mut self, file: &str) -> Self {
        self.fail_on = Some(file.to_string());
        self
    }

    pub fn failing_training(mut self) -> Self {
        self.fail_training = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn load_count(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, Call::Load(_))).count()
    }

    /// Images passed to inference, by file name
    pub fn inferred(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                Call::Infer(path, _) => Some(file_name(path)),
                _ => None,
            })
            .collect()
    }
}

impl DetectionEngine for ScriptedEngine {
    type Model = ScriptedModel;

    fn load(&self, model: &str) -> Result<Self::Model, EngineError> {
        self.calls.borrow_mut().push(Call::Load(model.to_string()));
        Ok(ScriptedModel {
            engine: self.clone(),
            weights: PathBuf::from(model),
        })
    }
}

pub struct ScriptedModel {
    engine: ScriptedEngine,
    weights: PathBuf,
}

impl DetectionModel for ScriptedModel {
    fn infer(
        &mut self,
        image: &Path,
        options: &InferenceOptions,
    ) -> Result<InferenceResult, EngineError> {
        self.engine
            .calls
            .borrow_mut()
            .push(Call::Infer(image.to_path_buf(), options.clone()));

        let name = file_name(image);
        if self.engine.fail_on.as_deref() == Some(name.as_str()) {
            return Err(EngineError::Other(format!("inference failed on {}", name)));
        }

        let mut result = InferenceResult::new(
            self.engine
                .summaries
                .get(&name)
                .cloned()
                .unwrap_or_else(|| "(no detections), ".to_string()),
        );

        if let Some(dir) = &options.save_dir {
            std::fs::create_dir_all(dir).map_err(|e| EngineError::Other(e.to_string()))?;
            let annotated = dir.join(&name);
            std::fs::copy(image, &annotated).map_err(|e| EngineError::Other(e.to_string()))?;
            result.annotated = Some(annotated);
        }

        Ok(result)
    }

    fn train(&mut self, request: &TrainRequest) -> Result<PathBuf, EngineError> {
        self.engine
            .calls
            .borrow_mut()
            .push(Call::Train(request.clone()));

        if self.engine.fail_training {
            return Err(EngineError::Other("CUDA out of memory".to_string()));
        }

        let weights_dir = request.save_dir.join("train").join("weights");
        std::fs::create_dir_all(&weights_dir).map_err(|e| EngineError::Other(e.to_string()))?;
        let weights = weights_dir.join("best.pt");
        std::fs::write(&weights, b"trained").map_err(|e| EngineError::Other(e.to_string()))?;

        self.weights = weights.clone();
        Ok(weights)
    }

    fn export(&mut self, format: ExportFormat) -> Result<PathBuf, EngineError> {
        self.engine.calls.borrow_mut().push(Call::Export(format));

        let exported = plc::detection::ultralytics::export_artifact_path(&self.weights, format);
        std::fs::write(&exported, b"exported").map_err(|e| EngineError::Other(e.to_string()))?;
        Ok(exported)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
