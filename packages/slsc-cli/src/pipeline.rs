use crate::exit_codes;
use slsc_rs::dataset::RawDataset;
use slsc_rs::{
    io, InterRfDataset, InterpolationKind, RunConfig, SlscError, SlscProcessor, SlscResult,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A failed run with the exit code it maps to
#[derive(Debug)]
pub struct Failure {
    pub code: i32,
    pub message: String,
}

impl From<SlscError> for Failure {
    fn from(e: SlscError) -> Self {
        Self {
            code: exit_code_for(&e),
            message: e.to_string(),
        }
    }
}

/// Exit code for a library error: bad inputs are told apart from failed processing
pub fn exit_code_for(e: &SlscError) -> i32 {
    match e {
        SlscError::Cancelled { .. } => exit_codes::CANCELLED,
        SlscError::FileNotFound(_)
        | SlscError::ConfigError(_)
        | SlscError::InvalidParameter(_)
        | SlscError::InvalidGeometry(_)
        | SlscError::SizeMismatch { .. }
        | SlscError::OutOfRange { .. } => exit_codes::INPUT_ERROR,
        _ => exit_codes::EXECUTION_ERROR,
    }
}

/// Check that a path names a readable regular file
pub fn validate_file(path: &str) -> Result<(), String> {
    let p = Path::new(path);
    if !p.exists() {
        return Err(format!("File not found: {}", path));
    }
    if !p.is_file() {
        return Err(format!("Not a file: {}", path));
    }
    Ok(())
}

/// Load a configuration, optionally overriding its interpolation method
pub fn load_config(path: &str, interpolation: Option<&str>) -> Result<RunConfig, String> {
    let mut config = RunConfig::from_file(path).map_err(|e| e.to_string())?;
    if let Some(name) = interpolation {
        config.slsc.interpolation = name
            .parse::<InterpolationKind>()
            .map_err(|e| e.to_string())?;
    }
    Ok(config)
}

/// Read, reshape and process one rotation of a raw acquisition
pub fn run_pipeline(
    config: &RunConfig,
    data_path: &str,
    rotation: usize,
    cancel: Option<&AtomicBool>,
) -> slsc_rs::Result<SlscResult> {
    let raw = io::read_i16_samples(Path::new(data_path))?;
    let mut dataset = InterRfDataset::new(config.dataset_params())?;
    dataset.transform(&raw)?;
    let tensor = dataset.channel_tensor(rotation)?;

    let processor = SlscProcessor::from_config(config)?;
    let resampler = config.slsc.interpolation.build(0.0);
    let image = processor.process(&tensor, resampler.as_ref(), cancel)?;

    Ok(
        SlscResult::new(rotation, config.slsc.lags.clone(), processor.points(), image)
            .with_data_path(data_path.to_string()),
    )
}

/// Set `cancel` on Ctrl-C
pub fn watch_ctrl_c(cancel: Arc<AtomicBool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, cancelling after the current batch");
            cancel.store(true, Ordering::Relaxed);
        }
    })
}

/// Run the pipeline on the blocking pool, observing `cancel`
pub async fn run_blocking(
    config: RunConfig,
    data_path: String,
    rotation: usize,
    cancel: Arc<AtomicBool>,
) -> Result<SlscResult, Failure> {
    let outcome = tokio::task::spawn_blocking(move || {
        run_pipeline(&config, &data_path, rotation, Some(cancel.as_ref()))
    })
    .await;

    match outcome {
        Ok(result) => result.map_err(Failure::from),
        Err(e) => Err(Failure {
            code: exit_codes::EXECUTION_ERROR,
            message: format!("processing task failed: {}", e),
        }),
    }
}
