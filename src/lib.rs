//! CRO vision analysis library
//!
//! Turns a pair of above-the-fold screenshots (desktop + mobile) into a
//! strictly validated [`VisionAnalysisResult`] by asking a hosted
//! vision-capable model and checking its reply field by field.
//!
//! # Module Overview
//!
//! - [`analyzer`] - Pipeline orchestration (`analyze_above_fold`)
//! - [`invoker`] - Transport seam and bounded retry on HTTP 429
//! - [`client`] - HTTP transport for OpenAI-compatible Responses endpoints
//! - [`extract`] - Payload, usage and truncation detection over raw replies
//! - [`validate`] - Field-addressed schema validation
//! - [`cost`] - Token usage cost estimate
//! - [`prompt`] - Instruction text per analysis context
//! - [`config`] - TOML configuration with environment fallbacks
//! - [`image_loader`] - Screenshot files to base64 PNG
//! - [`output`] - JSON output schemas for the CLI
//!
//! # Example
//!
//! ```no_run
//! use cro_lib::{Config, VisionAnalyzer};
//!
//! # async fn example(desktop_b64: &str, mobile_b64: &str) -> cro_lib::Result<()> {
//! let config = Config::load(None).unwrap_or_default();
//! let analyzer = VisionAnalyzer::from_config(&config)?;
//! let result = analyzer.analyze_above_fold(desktop_b64, mobile_b64).await?;
//! println!("{} CTAs, confidence {}", result.ctas().len(), result.confidence());
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod client;
pub mod config;
pub mod cost;
pub mod error;
pub mod extract;
pub mod image_loader;
pub mod invoker;
pub mod output;
pub mod prompt;
pub mod types;
pub mod validate;

pub use analyzer::{analyze_reply, AnalyzerSettings, ProgressCallback, Stage, VisionAnalyzer};
pub use client::{OpenAiTransport, DEFAULT_API_ENDPOINT};
pub use config::Config;
pub use cost::{Pricing, Usage};
pub use error::{ErrorCategory, ErrorPayload, Result, VisionAnalysisError};
pub use extract::{ensure_complete, extract_payload, extract_text, extract_usage, ReplyShape};
pub use image_loader::{screenshot_to_base64, ImageLoadError};
pub use invoker::{
    invoke_with_retry, RetryPolicy, Sleeper, TokioSleeper, TransportError, VisionRequest,
    VisionTransport,
};
pub use output::{AnalyzeOutput, CroOutput, ErrorOutput, ValidateOutput, CRO_OUTPUT_VERSION};
pub use prompt::{compose_prompt, PromptContext, SYSTEM_GUIDANCE};
pub use types::{
    AnalysisStatus, CallToAction, CostEstimate, Differences, Hero, HeroCta, Level,
    PerformanceSignals, Responsiveness, VisionAnalysisResult,
};
pub use validate::{parse_and_validate, validate_value, SchemaViolation};
