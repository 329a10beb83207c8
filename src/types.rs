//! Typed result of an above-the-fold vision analysis.
//!
//! [`VisionAnalysisResult`] is only produced by the validator in
//! [`crate::validate`], so a value of this type always satisfies the response
//! contract (including `visual_hierarchy.len() <= 3`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of entries kept in `visualHierarchy`.
pub const MAX_VISUAL_HIERARCHY: usize = 3;

/// Fallback for a call-to-action without a usable location hint.
pub const UNSPECIFIED_LOCATION: &str = "unspecified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Ok,
    /// The screenshots could not be interpreted; other fields may be empty.
    Unreadable,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Ok => "ok",
            AnalysisStatus::Unreadable => "unreadable",
        }
    }
}

impl FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(AnalysisStatus::Ok),
            "unreadable" => Ok(AnalysisStatus::Unreadable),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-step scale shared by CTA prominence, responsiveness risk and model confidence.
///
/// Parsing is case-sensitive: `"High"` is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Level::Low),
            "medium" => Ok(Level::Medium),
            "high" => Ok(Level::High),
            other => Err(format!("unknown level '{other}'")),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroCta {
    pub text: Option<String>,
    pub style_clues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hero {
    pub headline: Option<String>,
    pub subheadline: Option<String>,
    pub cta: HeroCta,
    pub supporting_elements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToAction {
    /// Empty when the model reported no label.
    pub text: String,
    pub prominence: Level,
    pub location_hint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Responsiveness {
    pub issues: Vec<String>,
    pub overall_risk: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSignals {
    pub heavy_media: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Differences {
    pub notes: Vec<String>,
    pub flagged: bool,
}

/// Approximate spend for one model call. Not a billing figure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub estimated_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionAnalysisResult {
    pub(crate) status: AnalysisStatus,
    pub(crate) hero: Hero,
    pub(crate) ctas: Vec<CallToAction>,
    pub(crate) trust_signals: Vec<String>,
    pub(crate) visual_hierarchy: Vec<String>,
    pub(crate) responsiveness: Responsiveness,
    pub(crate) performance_signals: PerformanceSignals,
    pub(crate) differences: Differences,
    pub(crate) confidence: Level,
    /// Absent means the cost is unknown, not zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) cost: Option<CostEstimate>,
}

impl VisionAnalysisResult {
    pub fn status(&self) -> AnalysisStatus {
        self.status
    }

    pub fn is_unreadable(&self) -> bool {
        self.status == AnalysisStatus::Unreadable
    }

    pub fn hero(&self) -> &Hero {
        &self.hero
    }

    pub fn ctas(&self) -> &[CallToAction] {
        &self.ctas
    }

    pub fn trust_signals(&self) -> &[String] {
        &self.trust_signals
    }

    pub fn visual_hierarchy(&self) -> &[String] {
        &self.visual_hierarchy
    }

    pub fn responsiveness(&self) -> &Responsiveness {
        &self.responsiveness
    }

    pub fn performance_signals(&self) -> &PerformanceSignals {
        &self.performance_signals
    }

    pub fn differences(&self) -> &Differences {
        &self.differences
    }

    pub fn confidence(&self) -> Level {
        self.confidence
    }

    pub fn cost(&self) -> Option<&CostEstimate> {
        self.cost.as_ref()
    }

    pub(crate) fn with_cost(self, cost: Option<CostEstimate>) -> Self {
        Self { cost, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parse_is_case_sensitive() {
        assert_eq!("medium".parse::<Level>(), Ok(Level::Medium));
        assert!("High".parse::<Level>().is_err());
        assert!("MEDIUM".parse::<Level>().is_err());
    }

    #[test]
    fn status_display_matches_wire_value() {
        assert_eq!(AnalysisStatus::Unreadable.to_string(), "unreadable");
        assert_eq!("ok".parse::<AnalysisStatus>(), Ok(AnalysisStatus::Ok));
    }

    #[test]
    fn cost_is_omitted_from_json_when_unknown() {
        let result = VisionAnalysisResult {
            status: AnalysisStatus::Ok,
            hero: Hero {
                headline: None,
                subheadline: None,
                cta: HeroCta {
                    text: None,
                    style_clues: vec![],
                },
                supporting_elements: vec![],
            },
            ctas: vec![CallToAction {
                text: "Start".into(),
                prominence: Level::High,
                location_hint: UNSPECIFIED_LOCATION.into(),
            }],
            trust_signals: vec![],
            visual_hierarchy: vec![],
            responsiveness: Responsiveness {
                issues: vec![],
                overall_risk: Level::Low,
            },
            performance_signals: PerformanceSignals {
                heavy_media: false,
                notes: None,
            },
            differences: Differences {
                notes: vec![],
                flagged: false,
            },
            confidence: Level::Medium,
            cost: None,
        };

        let json = serde_json::to_value(&result).expect("serialize");
        assert!(json.get("cost").is_none());
        assert_eq!(json["ctas"][0]["locationHint"], "unspecified");
        assert_eq!(json["performanceSignals"]["heavyMedia"], false);

        let priced = result.with_cost(Some(CostEstimate {
            input_tokens: 10,
            output_tokens: 5,
            estimated_usd: 0.0001,
        }));
        let json = serde_json::to_value(&priced).expect("serialize");
        assert_eq!(json["cost"]["inputTokens"], 10);
        assert_eq!(json["cost"]["estimatedUsd"], 0.0001);
    }
}
