use crate::error::ErrorPayload;
use crate::prompt::PromptContext;
use crate::types::VisionAnalysisResult;
use serde::{Deserialize, Serialize};

/// Schema version for output payloads.
pub const CRO_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum CroOutput {
    Analyze(AnalyzeOutput),
    Validate(ValidateOutput),
    Error(ErrorOutput),
}

impl CroOutput {
    pub fn result(&self) -> Option<&VisionAnalysisResult> {
        match self {
            CroOutput::Analyze(out) => Some(&out.result),
            CroOutput::Validate(out) => Some(&out.result),
            CroOutput::Error(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOutput {
    pub version: String,
    pub desktop: String,
    pub mobile: String,
    pub context: PromptContext,
    pub model: String,
    pub result: VisionAnalysisResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOutput {
    pub version: String,
    pub input: String,
    pub result: VisionAnalysisResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}
