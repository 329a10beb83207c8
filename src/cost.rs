//! Token-usage cost estimate against a published rate card.
//!
//! Estimates are approximations; they are never a billing source of truth.

use serde::{Deserialize, Serialize};

use crate::types::CostEstimate;

/// USD price per 1,000 tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input_per_1k: 0.0025,
            output_per_1k: 0.01,
        }
    }
}

/// Token counts reported by the provider for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Pricing {
    pub fn estimate_usd(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let usd = input_tokens as f64 / 1000.0 * self.input_per_1k
            + output_tokens as f64 / 1000.0 * self.output_per_1k;
        round4(usd)
    }

    pub fn estimate(&self, usage: Usage) -> CostEstimate {
        CostEstimate {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            estimated_usd: self.estimate_usd(usage.input_tokens, usage.output_tokens),
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
