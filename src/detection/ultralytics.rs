//! Backend that drives the Ultralytics `yolo` command-line program.
//!
//! Every operation is one blocking subprocess call. Results are recovered
//! from the program's log output and from the files it leaves on disk.
//! Training and export output is passed through to the console as it
//! arrives, since those calls can run for hours.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use super::{DetectionEngine, DetectionModel, EngineError, TrainRequest};
use crate::models::{ExportFormat, InferenceOptions, InferenceResult};

/// Default name of the toolkit's executable
pub const DEFAULT_PROGRAM: &str = "yolo";

/// Run name used for training, relative to the save directory
const TRAIN_RUN_NAME: &str = "train";

/// Trailing output kept in error messages
const ERROR_TAIL_LINES: usize = 20;

/// Bytes of passed-through output remembered per stream for error messages
const TAIL_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone)]
pub struct UltralyticsCli {
    program: PathBuf,
}

impl UltralyticsCli {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
        }
    }

    /// Use a different `yolo` executable (e.g. one inside a virtualenv)
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for UltralyticsCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionEngine for UltralyticsCli {
    type Model = UltralyticsModel;

    fn load(&self, model: &str) -> Result<Self::Model, EngineError> {
        // Probe the program once so a missing install fails here rather than mid-run
        let version = run(&self.program, &["version".to_string()])?;
        log::debug!(
            "using {} (version {})",
            self.program.display(),
            version.trim()
        );

        Ok(UltralyticsModel {
            program: self.program.clone(),
            weights: model.to_string(),
        })
    }
}

/// Model handle: the program plus the weights every call refers to
#[derive(Debug, Clone)]
pub struct UltralyticsModel {
    program: PathBuf,
    weights: String,
}

impl UltralyticsModel {
    pub fn weights(&self) -> &str {
        &self.weights
    }
}

impl DetectionModel for UltralyticsModel {
    fn infer(
        &mut self,
        image: &Path,
        options: &InferenceOptions,
    ) -> Result<InferenceResult, EngineError> {
        let args = predict_args(&self.weights, image, options);
        let output = run(&self.program, &args)?;

        let summary = extract_summary(&output, image)
            .ok_or_else(|| EngineError::MissingSummary(image.to_path_buf()))?;

        let annotated = match (&options.save_dir, image.file_name()) {
            (Some(dir), Some(name)) => Some(dir.join(name)).filter(|p| p.exists()),
            _ => None,
        };

        Ok(InferenceResult { summary, annotated })
    }

    fn train(&mut self, request: &TrainRequest) -> Result<PathBuf, EngineError> {
        let args = train_args(&self.weights, request);
        run_passthrough(&self.program, &args)?;

        let weights_dir = request.save_dir.join(TRAIN_RUN_NAME).join("weights");
        let weights = ["best.pt", "last.pt"]
            .iter()
            .map(|name| weights_dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| EngineError::MissingArtifact(weights_dir.join("best.pt")))?;

        self.weights = weights.to_string_lossy().into_owned();
        Ok(weights)
    }

    fn export(&mut self, format: ExportFormat) -> Result<PathBuf, EngineError> {
        let args = vec![
            "export".to_string(),
            format!("model={}", self.weights),
            format!("format={}", format),
        ];
        run_passthrough(&self.program, &args)?;

        let artifact = export_artifact_path(Path::new(&self.weights), format);
        if !artifact.exists() {
            return Err(EngineError::MissingArtifact(artifact));
        }
        Ok(artifact)
    }
}

/// Arguments for one `yolo predict` call
pub fn predict_args(weights: &str, image: &Path, options: &InferenceOptions) -> Vec<String> {
    let mut args = vec![
        "predict".to_string(),
        format!("model={}", weights),
        format!("source={}", image.display()),
        format!("conf={}", options.confidence),
        format!("imgsz={}", options.image_size),
        "show=False".to_string(),
        format!("show_labels={}", py_bool(options.show_labels)),
    ];

    match &options.save_dir {
        Some(dir) => {
            let project = dir.parent().unwrap_or_else(|| Path::new("."));
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            args.push("save=True".to_string());
            args.push(format!("project={}", project.display()));
            args.push(format!("name={}", name));
            args.push("exist_ok=True".to_string());
        }
        None => args.push("save=False".to_string()),
    }

    args.push("verbose=True".to_string());
    args
}

/// Arguments for one `yolo <task> train` call
pub fn train_args(weights: &str, request: &TrainRequest) -> Vec<String> {
    vec![
        request.task.to_string(),
        "train".to_string(),
        format!("data={}", request.data.display()),
        format!("model={}", weights),
        format!("epochs={}", request.epochs),
        format!("device={}", request.device),
        format!("project={}", request.save_dir.display()),
        format!("name={}", TRAIN_RUN_NAME),
        "exist_ok=True".to_string(),
    ]
}

/// Where the toolkit writes the exported artifact for a weights file
pub fn export_artifact_path(weights: &Path, format: ExportFormat) -> PathBuf {
    let stem = weights
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("{}{}", stem, format.artifact_suffix());
    match weights.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Pull the detection summary for `image` out of the toolkit's log output.
///
/// The line looks like `image 1/1 /data/a.jpg: 1280x960 2 cars, 1 person, 45.1ms`;
/// the resolution prefix and the timing suffix are dropped.
pub fn extract_summary(output: &str, image: &Path) -> Option<String> {
    let file_name = image.file_name()?.to_string_lossy();
    let marker = format!("{}: ", file_name);

    for line in output.lines() {
        if !line.trim_start().starts_with("image ") {
            continue;
        }
        let Some(idx) = line.find(&marker) else {
            continue;
        };

        let mut tokens: Vec<&str> = line[idx + marker.len()..].split_whitespace().collect();
        if tokens.first().is_some_and(|t| is_resolution(t)) {
            tokens.remove(0);
        }
        if tokens.last().is_some_and(|t| is_timing(t)) {
            tokens.pop();
        }
        return Some(tokens.join(" "));
    }

    None
}

fn is_resolution(token: &str) -> bool {
    match token.split_once('x') {
        Some((h, w)) => h.parse::<u32>().is_ok() && w.parse::<u32>().is_ok(),
        None => false,
    }
}

fn is_timing(token: &str) -> bool {
    token
        .strip_suffix("ms")
        .is_some_and(|t| t.parse::<f64>().is_ok())
}

fn py_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

fn run(program: &Path, args: &[String]) -> Result<String, EngineError> {
    let command_line = format!("{} {}", program.display(), args.join(" "));
    log::debug!("running: {}", command_line);

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| EngineError::Spawn {
            program: program.display().to_string(),
            source,
        })?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        return Err(EngineError::Failed {
            command: command_line,
            status: output.status.to_string(),
            output: tail_lines(&text),
        });
    }

    Ok(text)
}

/// Like [`run`], but the program's output goes to our stdout/stderr while it
/// runs. Only the tail is kept, for the error when the program fails.
fn run_passthrough(program: &Path, args: &[String]) -> Result<(), EngineError> {
    let command_line = format!("{} {}", program.display(), args.join(" "));
    log::debug!("running: {}", command_line);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| EngineError::Spawn {
            program: program.display().to_string(),
            source,
        })?;

    let stdout = child.stdout.take().map(|out| {
        thread::spawn(move || tee_output(out, std::io::stdout(), TAIL_BYTES))
    });
    let stderr = child.stderr.take().map(|err| {
        thread::spawn(move || tee_output(err, std::io::stderr(), TAIL_BYTES))
    });

    let status = child.wait().map_err(|source| EngineError::Spawn {
        program: program.display().to_string(),
        source,
    })?;

    let mut text = String::new();
    for handle in [stdout, stderr].into_iter().flatten() {
        let tail = handle.join().unwrap_or_default();
        text.push_str(&String::from_utf8_lossy(&tail));
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
    }

    if !status.success() {
        return Err(EngineError::Failed {
            command: command_line,
            status: status.to_string(),
            output: tail_lines(&text),
        });
    }

    Ok(())
}

/// Copy everything from `reader` to `sink` as it arrives, returning at most
/// the last `keep` bytes. Carriage returns are forwarded untouched so
/// in-place progress bars keep working.
pub fn tee_output<R: Read, W: Write>(mut reader: R, mut sink: W, keep: usize) -> Vec<u8> {
    let mut tail = VecDeque::with_capacity(keep);
    let mut buf = [0u8; 4096];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::debug!("stopped reading program output: {}", e);
                break;
            }
        };

        // The console going away must not stop us draining the pipe
        let _ = sink.write_all(&buf[..n]).and_then(|_| sink.flush());

        tail.extend(&buf[..n]);
        if tail.len() > keep {
            tail.drain(..tail.len() - keep);
        }
    }

    tail.into()
}

fn tail_lines(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(ERROR_TAIL_LINES)..].join("\n")
}
