use crate::image_loader::ImageLoadError;
use crate::invoker::TransportError;
use crate::validate::SchemaViolation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionAnalysisError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Vision model request failed after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("Vision model stopped before finishing: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Incomplete { reason: Option<String> },

    #[error("Vision model returned an empty response")]
    EmptyResponse,

    #[error("Vision model returned invalid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Vision response failed validation: {0}")]
    Schema(#[from] SchemaViolation),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl VisionAnalysisError {
    pub fn config(message: impl Into<String>) -> Self {
        VisionAnalysisError::Config(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        VisionAnalysisError::InvalidInput(message.into())
    }

    /// HTTP status of the terminal transport failure, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            VisionAnalysisError::Transport { source, .. } => source.status(),
            _ => None,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            VisionAnalysisError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("api key") || lower.contains("api_key") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        self.to_string(),
                        "Set CRO_VISION_API_KEY (or OPENAI_API_KEY), or api_key under [vision] in the config file.",
                    )
                } else if lower.contains("failed to read config")
                    || lower.contains("invalid config")
                {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        self.to_string(),
                        "Check the TOML passed via --config (or ~/.config/cro/config.toml).",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        self.to_string(),
                        "Check flags, config file values and required environment variables.",
                    )
                }
            }
            VisionAnalysisError::InvalidInput(_) => ErrorPayload::new(
                ErrorCategory::Input,
                self.to_string(),
                "Provide both a desktop and a mobile screenshot.",
            ),
            VisionAnalysisError::Transport { source, .. } => match source.status() {
                Some(429) => ErrorPayload::new(
                    ErrorCategory::Network,
                    self.to_string(),
                    "The provider kept rate limiting; wait a bit or raise [retry] max_attempts.",
                ),
                Some(401) | Some(403) => ErrorPayload::new(
                    ErrorCategory::Network,
                    self.to_string(),
                    "Check that the API key is valid and has access to the configured model.",
                ),
                Some(_) => ErrorPayload::new(
                    ErrorCategory::Network,
                    self.to_string(),
                    "Inspect the provider message; verify model name and image payloads.",
                ),
                None => ErrorPayload::new(
                    ErrorCategory::Network,
                    self.to_string(),
                    "Check connectivity/proxy/VPN and the configured api_endpoint, then retry.",
                ),
            },
            VisionAnalysisError::Incomplete { .. } => ErrorPayload::new(
                ErrorCategory::Model,
                self.to_string(),
                "Raise [vision] max_output_tokens or retry; the reply was cut short.",
            ),
            VisionAnalysisError::EmptyResponse => ErrorPayload::new(
                ErrorCategory::Model,
                self.to_string(),
                "The model produced no text; retry or try a different model.",
            ),
            VisionAnalysisError::Parse(_) => ErrorPayload::new(
                ErrorCategory::Model,
                self.to_string(),
                "The model reply was not JSON; retry or run `cro validate` on the saved reply.",
            ),
            VisionAnalysisError::Schema(_) => ErrorPayload::new(
                ErrorCategory::Schema,
                self.to_string(),
                "The model reply did not match the expected shape; retry the analysis.",
            ),
            VisionAnalysisError::Io(_) => ErrorPayload::new(
                ErrorCategory::Config,
                self.to_string(),
                "Check file paths/permissions.",
            ),
            VisionAnalysisError::Image(_) => ErrorPayload::new(
                ErrorCategory::Image,
                self.to_string(),
                "Verify the screenshot path/format (png, jpg, jpeg, webp, gif) and readability.",
            ),
        }
    }
}

impl From<ImageLoadError> for VisionAnalysisError {
    fn from(err: ImageLoadError) -> Self {
        match err {
            ImageLoadError::Load(e) => VisionAnalysisError::Image(e),
            ImageLoadError::NotFound(path) => {
                VisionAnalysisError::Config(format!("Screenshot file not found: {}", path))
            }
            ImageLoadError::UnsupportedExtension(ext) => VisionAnalysisError::Config(format!(
                "Unsupported file extension '{}'. Supported image extensions: png, jpg, jpeg, webp, gif.",
                ext
            )),
            ImageLoadError::Encode(msg) => VisionAnalysisError::Io(std::io::Error::other(format!(
                "Failed to encode screenshot: {}",
                msg
            ))),
        }
    }
}

pub type Result<T> = std::result::Result<T, VisionAnalysisError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Input,
    Network,
    Model,
    Schema,
    Image,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
