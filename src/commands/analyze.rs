use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use cro_lib::output::CRO_OUTPUT_VERSION;
use cro_lib::{
    screenshot_to_base64, AnalyzeOutput, CroOutput, ProgressCallback, PromptContext,
    VisionAnalysisError, VisionAnalyzer,
};

use crate::cli::OutputFormat;
use crate::formatting::{exit_code_for_result, render_error, write_output};
use crate::settings::{format_effective_config, load_config};

/// Run the analyze command.
#[allow(clippy::too_many_arguments)]
pub async fn run_analyze(
    config_path: Option<PathBuf>,
    verbose: bool,
    desktop: PathBuf,
    mobile: PathBuf,
    context: PromptContext,
    max_dimension: Option<u32>,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output.clone()),
    };
    let max_dimension = match max_dimension {
        Some(0) => {
            return render_error(
                VisionAnalysisError::config("--max-dimension must be greater than zero"),
                format,
                output.clone(),
            )
        }
        Some(dim) => dim,
        None => config.images.max_dimension,
    };

    if verbose {
        eprintln!(
            "{}",
            format_effective_config(&config, max_dimension, config_path.as_deref())
        );
        eprintln!("Encoding screenshots\u{2026}");
    }

    let desktop_b64 = match screenshot_to_base64(&desktop, max_dimension) {
        Ok(b64) => b64,
        Err(err) => return render_error(err.into(), format, output.clone()),
    };
    let mobile_b64 = match screenshot_to_base64(&mobile, max_dimension) {
        Ok(b64) => b64,
        Err(err) => return render_error(err.into(), format, output.clone()),
    };

    let progress_logger: Option<ProgressCallback> = if verbose {
        Some(Arc::new(|msg: &str| eprintln!("{msg}")))
    } else {
        None
    };
    let analyzer = match VisionAnalyzer::from_config(&config) {
        Ok(analyzer) => analyzer.with_progress(progress_logger),
        Err(err) => return render_error(err, format, output.clone()),
    };

    let result = match analyzer
        .analyze_above_fold_with_context(&desktop_b64, &mobile_b64, context)
        .await
    {
        Ok(result) => result,
        Err(err) => return render_error(err, format, output.clone()),
    };

    let exit_code = exit_code_for_result(&result);
    let body = CroOutput::Analyze(AnalyzeOutput {
        version: CRO_OUTPUT_VERSION.to_string(),
        desktop: desktop.display().to_string(),
        mobile: mobile.display().to_string(),
        context,
        model: analyzer.settings().model.clone(),
        result,
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(VisionAnalysisError::config(err.to_string()), format, output);
    }
    exit_code
}
