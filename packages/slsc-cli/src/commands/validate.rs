use crate::cli::ValidateArgs;
use crate::exit_codes;
use crate::output;
use crate::pipeline;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ValidateOutput {
    config: String,
    data: String,
    config_valid: bool,
    exists: bool,
    readable: bool,
    size_bytes: Option<u64>,
    expected_samples: Option<usize>,
    actual_samples: Option<u64>,
    error: Option<String>,
}

pub fn execute(args: ValidateArgs) -> i32 {
    let config = pipeline::load_config(&args.config, None);
    let path = Path::new(&args.data);

    let exists = path.exists();
    let readable = path.is_file() && std::fs::File::open(path).is_ok();
    let size_bytes = if readable {
        std::fs::metadata(path).ok().map(|m| m.len())
    } else {
        None
    };

    let expected_samples = config
        .as_ref()
        .ok()
        .map(|c| c.acquisition.expected_samples(c.probe.no_elements));
    let actual_samples = size_bytes.map(|b| b / 2);

    let error = if let Err(ref msg) = config {
        Some(msg.clone())
    } else if !exists {
        Some(format!("File not found: {}", args.data))
    } else if !readable {
        Some(format!("File is not readable: {}", args.data))
    } else if size_bytes.is_some_and(|b| b % 2 != 0) {
        Some(format!(
            "File size {} bytes is not a whole number of i16 samples",
            size_bytes.unwrap_or(0)
        ))
    } else if expected_samples.map(|n| n as u64) != actual_samples {
        Some(format!(
            "Sample count mismatch: configuration expects {}, file holds {}",
            expected_samples.unwrap_or(0),
            actual_samples.unwrap_or(0)
        ))
    } else {
        None
    };

    let result = ValidateOutput {
        config: args.config.clone(),
        data: args.data.clone(),
        config_valid: config.is_ok(),
        exists,
        readable,
        size_bytes,
        expected_samples,
        actual_samples,
        error: error.clone(),
    };

    if args.json {
        if let Err(e) = output::emit(&result, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else if let Some(ref err) = error {
        eprintln!("Error: {}", err);
    } else {
        println!(
            "File '{}' is valid ({} samples, {} bytes)",
            args.data,
            actual_samples.unwrap_or(0),
            size_bytes.unwrap_or(0)
        );
    }

    if error.is_some() {
        exit_codes::INPUT_ERROR
    } else {
        exit_codes::SUCCESS
    }
}
