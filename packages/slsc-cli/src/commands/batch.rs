use crate::cli::BatchArgs;
use crate::exit_codes;
use crate::output;
use crate::pipeline;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub async fn execute(args: BatchArgs) -> i32 {
    let files = match resolve_glob(&args.pattern) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if files.is_empty() {
        eprintln!("Error: No matching files found");
        return exit_codes::INPUT_ERROR;
    }

    if args.dry_run {
        for f in &files {
            println!("{}", f);
        }
        if !args.quiet {
            eprintln!("Found {} file(s)", files.len());
        }
        return exit_codes::SUCCESS;
    }

    let config = match pipeline::load_config(&args.config, None) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if let Some(ref dir) = args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Error: Failed to create output directory '{}': {}", dir, e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let watcher = pipeline::watch_ctrl_c(Arc::clone(&cancel));

    let total = files.len();
    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let mut cancelled = false;
    let start_time = Instant::now();

    for (i, file_path) in files.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            cancelled = true;
            break;
        }
        if !args.quiet {
            eprintln!("[{}/{}] {}...", i + 1, total, file_path);
        }

        let outcome = pipeline::run_blocking(
            config.clone(),
            file_path.clone(),
            args.rotation,
            Arc::clone(&cancel),
        )
        .await;

        let written = match outcome {
            Ok(result) => match args.output_dir {
                Some(ref dir) => {
                    let out_path = output_path_for(dir, file_path);
                    output::emit(&result, args.compact, out_path.to_str())
                }
                // JSONL to stdout
                None => output::emit(&result, true, None),
            },
            Err(failure) if failure.code == exit_codes::CANCELLED => {
                eprintln!("  Cancelled: {}", failure.message);
                cancelled = true;
                break;
            }
            Err(failure) => Err(failure.message),
        };

        match written {
            Ok(()) => succeeded += 1,
            Err(e) => {
                eprintln!("  Error: {}", e);
                failed += 1;
                if !args.continue_on_error {
                    break;
                }
            }
        }
    }
    watcher.abort();

    let elapsed = start_time.elapsed();

    if !args.quiet {
        eprintln!(
            "Batch complete: {}/{} succeeded, {}/{} failed, {:.1}s",
            succeeded,
            total,
            failed,
            total,
            elapsed.as_secs_f64()
        );
    }

    if cancelled {
        exit_codes::CANCELLED
    } else if failed == 0 {
        exit_codes::SUCCESS
    } else if succeeded > 0 {
        exit_codes::PARTIAL_FAILURE
    } else {
        exit_codes::EXECUTION_ERROR
    }
}

fn output_path_for(dir: &str, input: &str) -> std::path::PathBuf {
    let stem = Path::new(input)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    Path::new(dir).join(format!("{}_slsc.json", stem))
}

fn resolve_glob(pattern: &str) -> Result<Vec<String>, String> {
    let paths =
        glob::glob(pattern).map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;

    let mut files: Vec<String> = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    if let Some(s) = path.to_str() {
                        files.push(s.to_string());
                    }
                }
            }
            Err(e) => {
                eprintln!("Warning: glob error: {}", e);
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolve_glob_no_matches() {
        let result = resolve_glob("/nonexistent_dir_12345/*.bin").unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_resolve_glob_invalid_pattern() {
        assert!(resolve_glob("[").is_err());
    }

    #[test]
    fn test_resolve_glob_with_temp_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b.bin"), "").unwrap();
        fs::write(tmp.path().join("a.bin"), "").unwrap();
        fs::write(tmp.path().join("c.txt"), "").unwrap();
        fs::create_dir(tmp.path().join("d.bin")).unwrap();

        let pattern = format!("{}/*.bin", tmp.path().to_str().unwrap());
        let result = resolve_glob(&pattern).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result[0].ends_with("a.bin"));
    }

    #[test]
    fn test_output_path_uses_stem() {
        let path = output_path_for("/out", "/data/scan_01.bin");
        assert_eq!(path, Path::new("/out/scan_01_slsc.json"));
    }
}
