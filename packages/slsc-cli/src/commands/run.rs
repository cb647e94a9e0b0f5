use crate::cli::RunArgs;
use crate::exit_codes;
use crate::output;
use crate::pipeline;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub async fn execute(args: RunArgs) -> i32 {
    let config = match pipeline::load_config(&args.config, args.interpolation.as_deref()) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if let Err(msg) = pipeline::validate_file(&args.data) {
        eprintln!("Error: {}", msg);
        return exit_codes::INPUT_ERROR;
    }

    if args.rotation >= config.acquisition.nrot {
        eprintln!(
            "Error: rotation {} out of range (acquisition has {})",
            args.rotation, config.acquisition.nrot
        );
        return exit_codes::INPUT_ERROR;
    }

    if !args.quiet {
        eprintln!("Running SLSC on {}...", args.data);
        eprintln!(
            "  Probe: {} elements, pitch {} m",
            config.probe.no_elements, config.probe.pitch
        );
        eprintln!(
            "  Transmissions: {}, samples: {}",
            config.acquisition.nang, config.acquisition.nsamp
        );
        eprintln!("  Lags: {:?}", config.slsc.lags);
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let watcher = pipeline::watch_ctrl_c(Arc::clone(&cancel));
    let outcome = pipeline::run_blocking(config, args.data.clone(), args.rotation, cancel).await;
    watcher.abort();

    let result = match outcome {
        Ok(r) => r,
        Err(failure) => {
            eprintln!("SLSC processing failed: {}", failure.message);
            return failure.code;
        }
    };

    if !args.quiet && !result.image.masked.is_empty() {
        eprintln!(
            "  {} of {} points masked",
            result.image.masked.len(),
            result.point_count
        );
    }

    match output::emit(&result, args.compact, args.output.as_deref()) {
        Ok(()) => {
            if !args.quiet {
                if let Some(ref path) = args.output {
                    eprintln!("Results written to {}", path);
                }
            }
            exit_codes::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::EXECUTION_ERROR
        }
    }
}
