use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;

use faceswap_core::detection::domain::face_analyser::FaceAnalyser;
use faceswap_core::detection::infrastructure::execution_provider::KNOWN_PROVIDERS;
use faceswap_core::detection::infrastructure::onnx_face_analyser::OnnxFaceAnalyser;
use faceswap_core::pipeline::face_swap_use_case::FaceSwapUseCase;
use faceswap_core::pipeline::infrastructure::threaded_batch_executor::ThreadedBatchExecutor;
use faceswap_core::pipeline::pipeline_logger::LogPipelineLogger;
use faceswap_core::pipeline::status_reporter::LogStatusReporter;
use faceswap_core::pipeline::swap_session::SwapSession;
use faceswap_core::shared::config::SwapConfig;
use faceswap_core::shared::constants::{
    EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use faceswap_core::shared::media_type::is_image;
use faceswap_core::shared::model_resolver::ensure_available;
use faceswap_core::swapping::infrastructure::swapper_factory::inswapper_cache;
use faceswap_core::video::infrastructure::image_file_reader::ImageFileReader;
use faceswap_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Swap a source face into a target image or a directory of extracted video frames.
#[derive(Parser)]
#[command(name = "faceswap")]
struct Cli {
    /// Image containing the face to swap in.
    source: PathBuf,

    /// Target image or video file.
    target: PathBuf,

    /// Output image (image targets only).
    output: Option<PathBuf>,

    /// Directory of frames extracted from the target video; frames are
    /// rewritten in place, in file-name order.
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Replace every face instead of one tracked identity.
    #[arg(long, overrides_with = "no_many_faces")]
    many_faces: bool,

    /// Track one identity even if the config file enables many faces.
    #[arg(long, overrides_with = "many_faces")]
    no_many_faces: bool,

    /// Left-to-right index of the reference face.
    #[arg(long)]
    reference_face_position: Option<usize>,

    /// Frame index the reference face is taken from (video targets).
    #[arg(long)]
    reference_frame_number: Option<usize>,

    /// Maximum squared embedding distance for a face to match the reference.
    #[arg(long)]
    similar_face_distance: Option<f64>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Execution providers in priority order (comma-separated).
    #[arg(long, value_delimiter = ',')]
    execution_provider: Option<Vec<String>>,

    /// Worker threads for frame batches.
    #[arg(long)]
    execution_threads: Option<usize>,

    /// Directory holding (or receiving) the ONNX models.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Config file to use instead of the per-user one.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Persist the effective settings to the config file before running.
    #[arg(long)]
    save_config: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let config = build_config(&cli)?;
    if cli.save_config {
        save_config(&cli, &config)?;
    }

    let models_dir = config.resolved_models_dir()?;
    let analyser = build_analyser(&config, &models_dir)?;
    let swapper = inswapper_cache(
        models_dir,
        config.execution_providers.clone(),
        Some(Arc::new(download_progress("face swap model"))),
    );
    let threads = config.execution_threads;

    let use_case = FaceSwapUseCase::new(
        SwapSession::open(config, analyser, swapper),
        Box::new(ImageFileReader::new()),
        Box::new(ImageFileWriter::new()),
        Box::new(LogStatusReporter),
        Box::new(ThreadedBatchExecutor::new(
            threads,
            Box::new(LogPipelineLogger::default()),
        )),
    );

    finish(&cli, use_case)
}

/// Runs the swap, then releases the session whatever the outcome.
fn finish(cli: &Cli, use_case: FaceSwapUseCase) -> Result<(), Box<dyn std::error::Error>> {
    let result = swap(cli, &use_case);
    use_case.post_process();
    use_case.close();
    result
}

fn swap(cli: &Cli, use_case: &FaceSwapUseCase) -> Result<(), Box<dyn std::error::Error>> {
    use_case.pre_check()?;
    eprintln!();
    if !use_case.validate_inputs(&cli.source, &cli.target) {
        return Err("Input validation failed".into());
    }

    if is_image(&cli.target) {
        let output = cli
            .output
            .as_ref()
            .ok_or("Output file is required for image targets")?;
        use_case.process_image(&cli.source, &cli.target, output)?;
    } else {
        let dir = cli
            .frames_dir
            .as_ref()
            .ok_or("--frames-dir is required for video targets")?;
        let frames = list_frames(dir)?;
        log::info!("Found {} frames in {}", frames.len(), dir.display());
        use_case.process_video(&cli.source, &frames)?;
    }
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.output.is_none() && cli.frames_dir.is_none() {
        return Err("Either an output file or --frames-dir is required".into());
    }
    if let Some(dir) = &cli.frames_dir {
        if !dir.is_dir() {
            return Err(format!("Frames directory not found: {}", dir.display()).into());
        }
    }
    if let Some(providers) = &cli.execution_provider {
        for name in providers {
            if !KNOWN_PROVIDERS.contains(&name.trim().to_lowercase().as_str()) {
                log::warn!(
                    "Unknown execution provider '{name}' (known: {})",
                    KNOWN_PROVIDERS.join(", ")
                );
            }
        }
    }
    Ok(())
}

/// Per-user (or `--config`) settings with command-line overrides applied.
fn build_config(cli: &Cli) -> Result<SwapConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => SwapConfig::load_from(path),
        None => SwapConfig::load(),
    };

    if cli.many_faces {
        config.many_faces = true;
    } else if cli.no_many_faces {
        config.many_faces = false;
    }
    if let Some(position) = cli.reference_face_position {
        config.reference_face_position = position;
    }
    if let Some(frame) = cli.reference_frame_number {
        config.reference_frame_number = frame;
    }
    if let Some(distance) = cli.similar_face_distance {
        config.similar_face_distance = distance;
    }
    if let Some(confidence) = cli.confidence {
        config.detection_confidence = confidence;
    }
    if let Some(providers) = &cli.execution_provider {
        config.execution_providers = providers.clone();
    }
    if let Some(threads) = cli.execution_threads {
        config.execution_threads = threads;
    }
    if let Some(dir) = &cli.models_dir {
        config.models_dir = Some(dir.clone());
    }

    config.validate()?;
    Ok(config)
}

fn save_config(cli: &Cli, config: &SwapConfig) -> Result<(), Box<dyn std::error::Error>> {
    let path = cli
        .config
        .clone()
        .or_else(SwapConfig::config_path)
        .ok_or("Could not determine config directory")?;
    config.save_to(&path)?;
    log::info!("Settings saved to {}", path.display());
    Ok(())
}

fn build_analyser(
    config: &SwapConfig,
    models_dir: &Path,
) -> Result<Arc<dyn FaceAnalyser>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let detector_path = ensure_available(
        models_dir,
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        Some(Box::new(download_progress("face detection model"))),
    )?;
    log::info!("Resolving model: {EMBEDDING_MODEL_NAME}");
    let embedder_path = ensure_available(
        models_dir,
        EMBEDDING_MODEL_NAME,
        EMBEDDING_MODEL_URL,
        Some(Box::new(download_progress("face embedding model"))),
    )?;
    eprintln!();

    let analyser = OnnxFaceAnalyser::new(
        &detector_path,
        &embedder_path,
        &config.execution_providers,
        config.detection_confidence,
    )?;
    Ok(Arc::new(analyser))
}

/// Image files in `dir`, sorted by file name.
fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if is_image(&path) {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

fn download_progress(what: &'static str) -> impl Fn(u64, u64) + Send + Sync + 'static {
    move |downloaded, total| {
        if total > 0 {
            let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
            eprint!("\rDownloading {what}... {pct}%");
        } else {
            eprint!("\rDownloading {what}... {downloaded} bytes");
        }
    }
}
