use crate::cli::DelaysArgs;
use crate::exit_codes;
use crate::output;
use crate::pipeline;
use slsc_rs::SlscProcessor;

pub fn execute(args: DelaysArgs) -> i32 {
    let config = match pipeline::load_config(&args.config, None) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let tables = match SlscProcessor::from_config(&config).and_then(|p| p.delay_tables()) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return pipeline::exit_code_for(&e);
        }
    };

    match output::emit(&tables, args.compact, args.output.as_deref()) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::EXECUTION_ERROR
        }
    }
}
