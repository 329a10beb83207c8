use std::path::Path;

use cro_lib::{Config, VisionAnalysisError};

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/cro/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, VisionAnalysisError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        VisionAnalysisError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        VisionAnalysisError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Install the stderr logger; `--verbose` enables debug output for this crate.
/// `RUST_LOG` still takes precedence.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "warn,cro=debug,cro_lib=debug"
    } else {
        "warn"
    };
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

/// Format effective config as a single-line string. Never includes the API key.
pub fn format_effective_config(
    config: &Config,
    max_dimension: u32,
    config_source: Option<&Path>,
) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let key_state = if config.resolve_api_key().is_some() {
        "set"
    } else {
        "missing"
    };
    format!(
        "Effective config [{source}]: model={}, endpoint={}, api_key={key_state}, max_output_tokens={}, timeout={}s, retry: attempts={}, base_delay={}ms, pricing: in=${}/1K, out=${}/1K, max_dimension={}px",
        config.resolve_model(),
        config.resolve_endpoint(),
        config.vision.max_output_tokens,
        config.vision.timeout.as_secs(),
        config.retry.max_attempts,
        config.retry.base_delay.as_millis(),
        config.pricing.input_per_1k,
        config.pricing.output_per_1k,
        max_dimension,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn load_config_reports_invalid_values_with_path() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("cro.toml");
        std::fs::write(&path, "[retry]\nmax_attempts = 0\n").expect("write config");

        let err = load_config(Some(&path)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Invalid config"), "got: {msg}");
        assert!(msg.contains("max_attempts"), "got: {msg}");
    }

    #[test]
    fn load_config_reports_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/cro.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config /nonexistent/cro.toml"));
    }

    #[test]
    fn format_effective_config_includes_all_fields() {
        let mut cfg = Config::default();
        cfg.vision.model = Some("gpt-4o-mini".into());
        cfg.vision.api_key = Some("sk-secret-value".into());
        cfg.retry.base_delay = Duration::from_millis(500);

        let summary = format_effective_config(&cfg, 1200, Some(Path::new("cro.toml")));
        assert!(summary.contains("model=gpt-4o-mini"));
        assert!(summary.contains("api_key=set"));
        assert!(summary.contains("attempts=3"));
        assert!(summary.contains("base_delay=500ms"));
        assert!(summary.contains("max_dimension=1200px"));
        assert!(summary.contains("cro.toml"));
        assert!(!summary.contains("sk-secret-value"));
    }
}
