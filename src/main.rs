use std::io::Read;
use std::process::ExitCode;

use medvoice_lib::config::{self, IntakeConfig};
use medvoice_lib::pipeline::intake::IntakePipeline;

/// `medvoice [TRANSCRIPT]`: triage one transcript (argv, else stdin) and
/// print the intake outcome as JSON.
fn main() -> ExitCode {
    medvoice_lib::init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let transcript = match read_transcript() {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Failed to read transcript: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = IntakeConfig::from_env();
    let pipeline = IntakePipeline::from_config(&config);

    let outcome = match pipeline.analyze(&transcript) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Intake failed");
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&outcome) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to serialize outcome: {e}");
            ExitCode::FAILURE
        }
    }
}

fn read_transcript() -> std::io::Result<String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        return Ok(args.join(" "));
    }
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}
