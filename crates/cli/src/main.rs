mod settings;

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use serde::Serialize;

use facial_keypoints_core::pipeline::batch_executor::{BatchExecutor, BatchOutcome};
use facial_keypoints_core::pipeline::facial_keypoints_pipeline::FacialKeypointsPipeline;
use facial_keypoints_core::pipeline::infrastructure::threaded_batch_executor::ThreadedBatchExecutor;
use facial_keypoints_core::pipeline::pipeline_logger::{LogPipelineLogger, PipelineLogger};
use facial_keypoints_core::pipeline::results::FaceKeypointsResult;
use facial_keypoints_core::shared::config::PipelineConfig;
use facial_keypoints_core::shared::constants::IMAGE_EXTENSIONS;

use settings::Settings;

/// Detect faces and predict facial keypoints in images.
#[derive(Parser, Debug)]
#[command(name = "facial-keypoints", version)]
struct Cli {
    /// Input image files or directories of images.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON settings file (default: per-user config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// SeetaFace face classifier model.
    #[arg(long)]
    cascade: Option<PathBuf>,

    /// ONNX keypoint regression model.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Scan step between detection scales (> 1.0).
    #[arg(long)]
    scale_factor: Option<f64>,

    /// Agreeing candidate windows required to accept a face (>= 1).
    #[arg(long)]
    min_neighbors: Option<u32>,

    /// Smallest face to look for, in pixels (>= 20).
    #[arg(long)]
    min_face_size: Option<u32>,

    /// Square input size of the keypoint model.
    #[arg(long)]
    image_size: Option<u32>,

    /// Keypoints predicted per face.
    #[arg(long)]
    num_keypoints: Option<usize>,

    /// Only report the largest face in each image.
    #[arg(long)]
    single: bool,

    /// Worker threads, each with its own loaded models.
    #[arg(long)]
    workers: Option<usize>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

/// One line of output per input image.
#[derive(Serialize, Debug)]
struct ImageReport {
    input: String,
    n_faces: usize,
    faces: Vec<FaceKeypointsResult>,
    error: Option<String>,
}

impl From<BatchOutcome> for ImageReport {
    fn from(outcome: BatchOutcome) -> Self {
        let input = outcome.path.display().to_string();
        match outcome.result {
            Ok(result) => Self {
                input,
                n_faces: result.n_faces(),
                faces: result.faces,
                error: None,
            },
            Err(e) => Self {
                input,
                n_faces: 0,
                faces: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_level.as_str()),
    )
    .init();

    if let Err(e) = run(&cli, settings) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// File, then environment, then command line; later sources win.
fn load_settings(cli: &Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply_env()?;
    apply_cli(&mut settings, cli);
    Ok(settings)
}

fn apply_cli(settings: &mut Settings, cli: &Cli) {
    let config = &mut settings.pipeline;
    if let Some(ref p) = cli.cascade {
        config.cascade_path = p.clone();
    }
    if let Some(ref p) = cli.model {
        config.model_path = p.clone();
    }
    if let Some(v) = cli.scale_factor {
        config.scale_factor = v;
    }
    if let Some(v) = cli.min_neighbors {
        config.min_neighbors = v;
    }
    if let Some(v) = cli.min_face_size {
        config.min_face_size = v;
    }
    if let Some(v) = cli.image_size {
        config.image_size = v;
    }
    if let Some(v) = cli.num_keypoints {
        config.num_keypoints = v;
    }
    if let Some(v) = cli.workers {
        settings.workers = v;
    }
}

fn run(cli: &Cli, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let inputs = expand_inputs(&cli.inputs)?;
    validate(&settings, &inputs)?;

    let mut logger = LogPipelineLogger::default();
    let workers = settings.workers.min(inputs.len()).max(1);
    let pipelines = build_pipelines(&settings.pipeline, workers, &logger)?;

    let executor = ThreadedBatchExecutor::new();
    let outcomes = executor.execute(pipelines, inputs, !cli.single, &mut logger)?;

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    let reports: Vec<ImageReport> = outcomes.into_iter().map(ImageReport::from).collect();
    let json = if cli.pretty {
        serde_json::to_string_pretty(&reports)?
    } else {
        serde_json::to_string(&reports)?
    };
    println!("{json}");

    logger.summary();
    if failed > 0 {
        log::warn!("{failed} of {} image(s) failed", reports.len());
    }
    Ok(())
}

fn build_pipelines(
    config: &PipelineConfig,
    workers: usize,
    logger: &LogPipelineLogger,
) -> Result<Vec<FacialKeypointsPipeline>, Box<dyn std::error::Error>> {
    (0..workers)
        .map(|_| -> Result<FacialKeypointsPipeline, Box<dyn std::error::Error>> {
            let pipeline = FacialKeypointsPipeline::from_config(config)?;
            Ok(pipeline.with_logger(Box::new(logger.clone())))
        })
        .collect()
}

fn validate(settings: &Settings, inputs: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    if inputs.is_empty() {
        return Err("No input images found".into());
    }
    if let Some(missing) = inputs.iter().find(|p| !p.exists()) {
        return Err(format!("Input file not found: {}", missing.display()).into());
    }
    if settings.workers == 0 {
        return Err("Workers must be at least 1".into());
    }
    settings.pipeline.validate()?;
    Ok(())
}

/// Replaces each directory with the images directly inside it, sorted by
/// name. Files are passed through unchanged.
fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut expanded = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut images: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image(p))
                .collect();
            images.sort();
            expanded.extend(images);
        } else {
            expanded.push(input.clone());
        }
    }
    Ok(expanded)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
