use crate::cli::InfoArgs;
use crate::exit_codes;
use crate::output;
use serde::Serialize;
use slsc_rs::profiling::get_profile_log_location;

#[derive(Serialize)]
struct InfoOutput {
    cli_version: String,
    platform: String,
    arch: String,
    threads: usize,
    interpolation: Vec<&'static str>,
    profile_log: String,
}

pub fn execute(args: InfoArgs) -> i32 {
    let info = InfoOutput {
        cli_version: env!("CARGO_PKG_VERSION").to_string(),
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        threads: rayon::current_num_threads(),
        interpolation: vec!["linear", "cubic"],
        profile_log: get_profile_log_location(),
    };

    if args.json {
        if let Err(e) = output::emit(&info, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else {
        println!("slsc CLI v{}", info.cli_version);
        println!("Platform: {} ({})", info.platform, info.arch);
        println!();
        println!("Worker threads: {}", info.threads);
        println!("Interpolation: {}", info.interpolation.join(", "));
        println!("Profile log: {}", info.profile_log);
    }

    exit_codes::SUCCESS
}
