use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use plc::{ExportFormat, PredictOptions, TaskMode, TrainingJob, UltralyticsCli};

#[derive(Parser)]
#[command(name = "plc")]
#[command(about = "Train YOLO detectors and count detected objects per image")]
struct Cli {
    /// The Ultralytics `yolo` executable to run
    #[arg(long, global = true, env = "PLC_YOLO_BIN", default_value = "yolo", value_name = "PATH")]
    yolo_bin: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count objects in every matching image of a directory
    Predict {
        /// Trained weights file
        #[arg(value_name = "MODEL")]
        model_path: PathBuf,

        /// Directory containing the images
        #[arg(value_name = "IMAGE_DIR")]
        image_dir: PathBuf,

        /// Only process files whose name ends with this
        #[arg(long, default_value = ".jpg")]
        suffix: String,

        /// Don't save annotated images
        #[arg(long)]
        no_save_images: bool,

        /// Don't write the results table
        #[arg(long)]
        no_save_table: bool,

        /// Where annotated images and the table are written
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// File name of the results table inside the output directory
        #[arg(long, default_value = "results.csv")]
        table_name: String,

        /// Field delimiter of the results table
        #[arg(long, default_value_t = ',')]
        delimiter: char,

        /// Minimum detection confidence
        #[arg(long, default_value_t = 0.2)]
        confidence: f32,

        /// Square inference resolution
        #[arg(long, default_value_t = 1280)]
        image_size: u32,
    },

    /// Train a model on a dataset and export it
    Train {
        /// Dataset descriptor (.yaml)
        #[arg(value_name = "DATA")]
        data_path: PathBuf,

        /// Directory for training output
        #[arg(value_name = "SAVE_DIR")]
        save_dir: PathBuf,

        /// Base weights or pretrained model name
        #[arg(long, default_value = plc::train::DEFAULT_BASE_MODEL)]
        model: String,

        #[arg(long, value_enum, default_value_t = TaskMode::Detect)]
        task: TaskMode,

        #[arg(long, default_value_t = 100)]
        epochs: u32,

        /// Compute device, e.g. `cpu`, `0` or `mps`
        #[arg(long, default_value = "cpu")]
        device: String,

        #[arg(long, value_enum, default_value_t = ExportFormat::Onnx)]
        export_format: ExportFormat,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let engine = UltralyticsCli::new().with_program(&args.yolo_bin);

    match args.command {
        Command::Predict {
            model_path,
            image_dir,
            suffix,
            no_save_images,
            no_save_table,
            output_dir,
            table_name,
            delimiter,
            confidence,
            image_size,
        } => {
            let mut options = PredictOptions::new()
                .with_suffix(suffix)
                .with_save_images(!no_save_images)
                .with_save_table(!no_save_table)
                .with_table_name(table_name)
                .with_delimiter(delimiter)
                .with_confidence(confidence)
                .with_image_size(image_size);
            if let Some(dir) = output_dir {
                options = options.with_output_dir(dir);
            }

            let table = plc::predict(&engine, &model_path, &image_dir, &options)
                .with_context(|| format!("Prediction over {} failed", image_dir.display()))?;

            println!("\n=== Object Counts ===");
            println!("Images processed: {}", table.len());
            println!("Classes detected: {}", table.columns().len());

            if args.verbose {
                for row in table.rows() {
                    let counts: Vec<String> = table
                        .columns()
                        .iter()
                        .zip(&row.counts)
                        .filter(|(_, n)| **n > 0)
                        .map(|(class, n)| format!("{} {}", n, class))
                        .collect();
                    println!("  {}: {}", row.image, counts.join(", "));
                }
            }
        }
        Command::Train {
            data_path,
            save_dir,
            model,
            task,
            epochs,
            device,
            export_format,
        } => {
            let job = TrainingJob::new(data_path, save_dir)
                .with_base_model(model)
                .with_task(task)
                .with_epochs(epochs)
                .with_device(device)
                .with_export_format(export_format);

            let artifacts = plc::train(&engine, &job).context("Training failed")?;

            println!("Weights: {}", artifacts.weights.display());
            println!("Exported: {}", artifacts.exported.display());
        }
    }

    Ok(())
}
