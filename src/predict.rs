use std::path::{Path, PathBuf};

use crate::detection::{DetectionEngine, DetectionModel, parse_summary};
use crate::error::{PlcError, Result};
use crate::models::InferenceOptions;
use crate::table::{DEFAULT_DELIMITER, ResultsTable, RowAccumulator};

/// Subfolder of the output directory that receives annotated images
pub const IMAGE_SUBDIR: &str = "image";

/// Options for a predict run
#[derive(Debug, Clone)]
pub struct PredictOptions {
    /// Only directory entries whose name ends with this (case-sensitive) are processed
    pub suffix: String,
    pub save_images: bool,
    pub save_table: bool,
    /// Required when `save_images` or `save_table` is set
    pub output_dir: Option<PathBuf>,
    pub table_name: String,
    pub delimiter: char,
    pub confidence: f32,
    pub image_size: u32,
}

impl PredictOptions {
    pub fn new() -> Self {
        Self {
            suffix: ".jpg".to_string(),
            save_images: true,
            save_table: true,
            output_dir: None,
            table_name: "results.csv".to_string(),
            delimiter: DEFAULT_DELIMITER,
            confidence: InferenceOptions::default().confidence,
            image_size: InferenceOptions::default().image_size,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_save_images(mut self, save_images: bool) -> Self {
        self.save_images = save_images;
        self
    }

    pub fn with_save_table(mut self, save_table: bool) -> Self {
        self.save_table = save_table;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_image_size(mut self, image_size: u32) -> Self {
        self.image_size = image_size;
        self
    }

    fn wants_output(&self) -> bool {
        self.save_images || self.save_table
    }
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the model over every matching image in `image_dir` and tabulate class counts.
///
/// Images are processed one at a time in directory-listing order, which is
/// not guaranteed to be sorted. The first failing inference aborts the run.
pub fn predict<E: DetectionEngine>(
    engine: &E,
    model_path: &Path,
    image_dir: &Path,
    options: &PredictOptions,
) -> Result<ResultsTable> {
    if !model_path.is_file() {
        return Err(PlcError::precondition(format!(
            "model path {} must be an existing file",
            model_path.display()
        )));
    }
    if !image_dir.is_dir() {
        return Err(PlcError::precondition(format!(
            "image directory {} must be an existing directory",
            image_dir.display()
        )));
    }
    // The toolkit takes the model as text; a lossy conversion would name a different file
    let model_ref = model_path.to_str().ok_or_else(|| {
        PlcError::precondition(format!(
            "model path {} is not valid UTF-8",
            model_path.display()
        ))
    })?;

    let output_dir = if options.wants_output() {
        Some(prepare_output_dir(options.output_dir.as_deref())?)
    } else {
        None
    };

    let mut model = engine.load(model_ref)?;

    let inference = InferenceOptions {
        confidence: options.confidence,
        image_size: options.image_size,
        show_labels: false,
        save_dir: match &output_dir {
            Some(dir) if options.save_images => Some(dir.join(IMAGE_SUBDIR)),
            _ => None,
        },
    };

    let entries = std::fs::read_dir(image_dir).map_err(|e| PlcError::io(image_dir, e))?;
    let mut accumulator = RowAccumulator::new();

    for entry in entries {
        let entry = entry.map_err(|e| PlcError::io(image_dir, e))?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            log::debug!("skipping non UTF-8 entry {:?}", entry.file_name());
            continue;
        };
        if !name.ends_with(&options.suffix) {
            continue;
        }

        let path = entry.path();
        if !path.is_file() {
            log::debug!("skipping {}: not a file", path.display());
            continue;
        }

        println!("Predicting {}...", name);

        let result = model.infer(&path, &inference)?;
        if let Some(annotated) = &result.annotated {
            log::debug!("annotated image at {}", annotated.display());
        }
        let counts = parse_summary(&result.summary)?;
        log::debug!("{}: {:?}", name, counts);

        accumulator.push(name, counts)?;
    }

    let table = accumulator.finish();

    if options.save_table {
        if let Some(dir) = &output_dir {
            let save_path = dir.join(&options.table_name);
            table.write_delimited(&save_path, options.delimiter)?;
            println!("Results saved to {}", save_path.display());
        }
    }

    Ok(table)
}

fn prepare_output_dir(output_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = output_dir.ok_or_else(|| {
        PlcError::precondition("an output directory is required when saving images or the table")
    })?;

    std::fs::create_dir_all(dir).map_err(|e| {
        PlcError::precondition(format!(
            "output directory {} could not be created: {}",
            dir.display(),
            e
        ))
    })?;

    if !dir.is_dir() {
        return Err(PlcError::precondition(format!(
            "output directory {} must be a directory",
            dir.display()
        )));
    }

    Ok(dir.to_path_buf())
}
