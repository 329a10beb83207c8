//! Above-the-fold analysis pipeline.
//!
//! `Idle -> Invoking -> Extracting -> Parsing -> Validating -> Done`, with any
//! stage able to fail. Only the retry loop inside `Invoking` repeats work; a
//! caller gets either a fully validated result or an error, never both.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::client::OpenAiTransport;
use crate::config::{Config, DEFAULT_MODEL};
use crate::cost::Pricing;
use crate::error::{Result, VisionAnalysisError};
use crate::extract::{ensure_complete, extract_payload, extract_usage};
use crate::invoker::{
    invoke_with_retry, RetryPolicy, Sleeper, TokioSleeper, VisionRequest, VisionTransport,
};
use crate::prompt::{compose_prompt, PromptContext, SYSTEM_GUIDANCE};
use crate::types::VisionAnalysisResult;
use crate::validate::{parse_reply_text, validate_value};

pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Invoking,
    Extracting,
    Parsing,
    Validating,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Invoking => "Calling vision model",
            Stage::Extracting => "Extracting reply text",
            Stage::Parsing => "Parsing JSON",
            Stage::Validating => "Validating response",
            Stage::Done => "Analysis complete",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub max_output_tokens: u32,
    pub retry: RetryPolicy,
    pub pricing: Pricing,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_output_tokens: 1500,
            retry: RetryPolicy::default(),
            pricing: Pricing::default(),
        }
    }
}

impl AnalyzerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.resolve_api_key(),
            model: config.resolve_model(),
            max_output_tokens: config.vision.max_output_tokens,
            retry: config.retry.policy(),
            pricing: config.pricing,
        }
    }
}

pub struct VisionAnalyzer<T, S = TokioSleeper> {
    settings: AnalyzerSettings,
    transport: T,
    sleeper: S,
    progress: Option<ProgressCallback>,
}

impl VisionAnalyzer<OpenAiTransport> {
    /// Build an analyzer that talks to the configured HTTP endpoint.
    ///
    /// A missing API key is not an error here; it is reported by the first
    /// analysis call, before anything is sent.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = OpenAiTransport::new(&config.resolve_endpoint(), config.vision.timeout)?;
        Ok(Self::new(AnalyzerSettings::from_config(config), transport))
    }
}

impl<T: VisionTransport> VisionAnalyzer<T> {
    pub fn new(settings: AnalyzerSettings, transport: T) -> Self {
        Self {
            settings,
            transport,
            sleeper: TokioSleeper,
            progress: None,
        }
    }
}

impl<T: VisionTransport, S: Sleeper> VisionAnalyzer<T, S> {
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> VisionAnalyzer<T, S2> {
        VisionAnalyzer {
            settings: self.settings,
            transport: self.transport,
            sleeper,
            progress: self.progress,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    pub async fn analyze_above_fold(
        &self,
        desktop_image_b64: &str,
        mobile_image_b64: &str,
    ) -> Result<VisionAnalysisResult> {
        self.analyze_above_fold_with_context(
            desktop_image_b64,
            mobile_image_b64,
            PromptContext::default(),
        )
        .await
    }

    pub async fn analyze_above_fold_with_context(
        &self,
        desktop_image_b64: &str,
        mobile_image_b64: &str,
        context: PromptContext,
    ) -> Result<VisionAnalysisResult> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                VisionAnalysisError::config(
                    "Vision API key is not configured; set CRO_VISION_API_KEY or OPENAI_API_KEY",
                )
            })?;
        if desktop_image_b64.trim().is_empty() {
            return Err(VisionAnalysisError::invalid_input("desktop screenshot is empty"));
        }
        if mobile_image_b64.trim().is_empty() {
            return Err(VisionAnalysisError::invalid_input("mobile screenshot is empty"));
        }

        let request = VisionRequest {
            model: self.settings.model.clone(),
            instructions: SYSTEM_GUIDANCE.to_string(),
            prompt: compose_prompt(context),
            desktop_image: desktop_image_b64.to_string(),
            mobile_image: mobile_image_b64.to_string(),
            max_output_tokens: self.settings.max_output_tokens,
        };

        self.report(Stage::Invoking);
        let reply = invoke_with_retry(
            &self.transport,
            &self.sleeper,
            &self.settings.retry,
            api_key,
            &request,
        )
        .await?;

        let result = process_reply(&reply, &self.settings.pricing, |stage| self.report(stage))?;
        self.report(Stage::Done);
        Ok(result)
    }

    fn report(&self, stage: Stage) {
        log::debug!("{stage}");
        if let Some(progress) = &self.progress {
            progress(&format!("{stage}\u{2026}"));
        }
    }
}

/// Run the post-invocation stages over a raw provider reply.
///
/// Used by the live pipeline and for re-checking saved replies offline.
pub fn analyze_reply(reply: &Value, pricing: &Pricing) -> Result<VisionAnalysisResult> {
    process_reply(reply, pricing, |stage| log::debug!("{stage}"))
}

fn process_reply(
    reply: &Value,
    pricing: &Pricing,
    report: impl Fn(Stage),
) -> Result<VisionAnalysisResult> {
    report(Stage::Extracting);
    ensure_complete(reply)?;
    let (shape, text) = extract_payload(reply).ok_or(VisionAnalysisError::EmptyResponse)?;
    log::debug!("vision payload recovered from {shape} ({} bytes)", text.len());

    report(Stage::Parsing);
    let value = parse_reply_text(&text)?;

    report(Stage::Validating);
    let result = validate_value(&value)?;

    let cost = extract_usage(reply).map(|usage| pricing.estimate(usage));
    Ok(result.with_cost(cost))
}
