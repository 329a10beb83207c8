//! Instruction text sent alongside the screenshots.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which framing the model is asked to use for the screenshot pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptContext {
    Desktop,
    Mobile,
    #[default]
    Comparison,
}

impl PromptContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptContext::Desktop => "desktop",
            PromptContext::Mobile => "mobile",
            PromptContext::Comparison => "comparison",
        }
    }
}

impl FromStr for PromptContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(PromptContext::Desktop),
            "mobile" => Ok(PromptContext::Mobile),
            "comparison" => Ok(PromptContext::Comparison),
            other => Err(format!(
                "unknown prompt context '{other}' (expected desktop, mobile or comparison)"
            )),
        }
    }
}

impl fmt::Display for PromptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed guidance sent as the model's instructions on every call.
pub const SYSTEM_GUIDANCE: &str = r#"You are a conversion-rate-optimization (CRO) analyst reviewing above-the-fold screenshots of a landing page.
You receive two images in this order: 1) the DESKTOP viewport, 2) the MOBILE viewport of the same page.
Only report what is visible in the screenshots. Do not guess at content below the fold.
If the images cannot be interpreted (blank, error page, unrelated content), set "status" to "unreadable" and keep every other field minimal.
Respond with a single JSON object and nothing else. No Markdown, no commentary."#;

const RESPONSE_CONTRACT: &str = r#"Return JSON with exactly this shape:
{
  "status": "ok" | "unreadable",
  "hero": {
    "headline": string | null,
    "subheadline": string | null,
    "cta": { "text": string | null, "styleClues": [string] },
    "supportingElements": [string]
  },
  "ctas": [ { "text": string | null, "prominence": "high" | "medium" | "low", "locationHint": string } ],
  "trustSignals": [string],
  "visualHierarchy": [string],  // the three elements that draw the eye first, in order
  "responsiveness": { "issues": [string], "overallRisk": "low" | "medium" | "high" },
  "performanceSignals": { "heavyMedia": boolean, "notes": string | null },
  "differences": { "notes": [string], "flagged": boolean },
  "confidence": "low" | "medium" | "high"
}
Enum values are lowercase."#;

/// Compose the per-call prompt for `context`.
pub fn compose_prompt(context: PromptContext) -> String {
    let focus = match context {
        PromptContext::Desktop => {
            "FOCUS: the DESKTOP screenshot. Use the mobile screenshot only to fill in \"responsiveness\" and \"differences\"."
        }
        PromptContext::Mobile => {
            "FOCUS: the MOBILE screenshot. Judge thumb reach, CTA visibility without scrolling and text legibility. Use the desktop screenshot only for \"differences\"."
        }
        PromptContext::Comparison => {
            "FOCUS: compare both screenshots. Flag \"differences.flagged\" when the mobile view drops, hides or demotes the primary CTA, headline or trust signals shown on desktop."
        }
    };

    format!("{focus}\n\n{RESPONSE_CONTRACT}")
}
