use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use cro_lib::extract::looks_like_provider_reply;
use cro_lib::output::CRO_OUTPUT_VERSION;
use cro_lib::{
    analyze_reply, parse_and_validate, CroOutput, Pricing, ValidateOutput, VisionAnalysisError,
    VisionAnalysisResult,
};
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::formatting::{exit_code_for_result, render_error, write_output};
use crate::settings::load_config;

/// Run the validate command.
pub async fn run_validate(
    config_path: Option<PathBuf>,
    verbose: bool,
    input: String,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output.clone()),
    };

    let raw = match read_input(&input) {
        Ok(raw) => raw,
        Err(err) => return render_error(err, format, output.clone()),
    };
    if verbose {
        eprintln!("Validating {} bytes from {}\u{2026}", raw.len(), input);
    }

    let result = match validate_text(&raw, &config.pricing) {
        Ok(result) => result,
        Err(err) => return render_error(err, format, output.clone()),
    };

    let exit_code = exit_code_for_result(&result);
    let body = CroOutput::Validate(ValidateOutput {
        version: CRO_OUTPUT_VERSION.to_string(),
        input,
        result,
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(VisionAnalysisError::config(err.to_string()), format, output);
    }
    exit_code
}

fn read_input(input: &str) -> Result<String, VisionAnalysisError> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).map_err(|e| {
        VisionAnalysisError::config(format!("Failed to read reply file {input}: {e}"))
    })
}

/// Accept either a raw provider reply or the bare analysis JSON (optionally fenced).
fn validate_text(
    raw: &str,
    pricing: &Pricing,
) -> Result<VisionAnalysisResult, VisionAnalysisError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) if looks_like_provider_reply(&value) => analyze_reply(&value, pricing),
        _ => parse_and_validate(raw),
    }
}
