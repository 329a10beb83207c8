//! Field-by-field validation of the model's JSON reply.
//!
//! Every rule is a small function returning [`Check<T>`]; [`validate_value`]
//! composes them in a fixed order and stops at the first violation. Missing
//! keys are treated as JSON `null`, so they only pass where `null` is allowed.
//!
//! Two leniencies exist and no others: `visualHierarchy` is truncated to
//! [`MAX_VISUAL_HIERARCHY`] entries, and a CTA `locationHint` that is missing or
//! not a string becomes [`UNSPECIFIED_LOCATION`].

use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::{Result, VisionAnalysisError};
use crate::types::{
    AnalysisStatus, CallToAction, Differences, Hero, HeroCta, Level, PerformanceSignals,
    Responsiveness, VisionAnalysisResult, MAX_VISUAL_HIERARCHY, UNSPECIFIED_LOCATION,
};

const ROOT: &str = "$";
const LEVELS: &str = "one of \"low\", \"medium\", \"high\"";

/// First rule broken by a reply, addressed by field path (e.g. `ctas[2].prominence`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{path}` expected {expected}")]
pub struct SchemaViolation {
    pub path: String,
    pub expected: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
        }
    }
}

pub type Check<T> = std::result::Result<T, SchemaViolation>;

/// Parse extracted reply text and validate it.
///
/// A JSON syntax error is reported as [`VisionAnalysisError::Parse`]; a
/// well-formed document with the wrong shape as [`VisionAnalysisError::Schema`].
pub fn parse_and_validate(text: &str) -> Result<VisionAnalysisResult> {
    let value = parse_reply_text(text)?;
    Ok(validate_value(&value)?)
}

pub fn parse_reply_text(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(VisionAnalysisError::Parse)
}

pub fn validate_value(value: &Value) -> Check<VisionAnalysisResult> {
    let root = object_at(value, ROOT)?;

    let status = status_at(field(root, "status"), "status")?;
    let hero = hero_at(field(root, "hero"), "hero")?;
    let ctas = ctas_at(field(root, "ctas"), "ctas")?;
    let trust_signals = string_array_at(field(root, "trustSignals"), "trustSignals")?;
    let visual_hierarchy = visual_hierarchy_at(field(root, "visualHierarchy"), "visualHierarchy")?;
    let responsiveness = responsiveness_at(field(root, "responsiveness"), "responsiveness")?;
    let performance_signals =
        performance_signals_at(field(root, "performanceSignals"), "performanceSignals")?;
    let differences = differences_at(field(root, "differences"), "differences")?;
    let confidence = level_at(field(root, "confidence"), "confidence")?;

    Ok(VisionAnalysisResult {
        status,
        hero,
        ctas,
        trust_signals,
        visual_hierarchy,
        responsiveness,
        performance_signals,
        differences,
        confidence,
        cost: None,
    })
}

fn field<'a>(object: &'a Map<String, Value>, key: &str) -> &'a Value {
    object.get(key).unwrap_or(&Value::Null)
}

fn child(parent: &str, key: &str) -> String {
    if parent == ROOT {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn index(parent: &str, i: usize) -> String {
    format!("{parent}[{i}]")
}

fn object_at<'a>(value: &'a Value, path: &str) -> Check<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| SchemaViolation::new(path, "an object"))
}

fn nullable_string_at(value: &Value, path: &str) -> Check<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(SchemaViolation::new(path, "a string or null")),
    }
}

fn string_array_at(value: &Value, path: &str) -> Check<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| SchemaViolation::new(path, "an array of strings"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str()
                .map(str::to_owned)
                .ok_or_else(|| SchemaViolation::new(index(path, i), "a string"))
        })
        .collect()
}

fn bool_at(value: &Value, path: &str) -> Check<bool> {
    value
        .as_bool()
        .ok_or_else(|| SchemaViolation::new(path, "a boolean"))
}

fn level_at(value: &Value, path: &str) -> Check<Level> {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| SchemaViolation::new(path, LEVELS))
}

fn status_at(value: &Value, path: &str) -> Check<AnalysisStatus> {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| SchemaViolation::new(path, "\"ok\" or \"unreadable\""))
}

fn hero_at(value: &Value, path: &str) -> Check<Hero> {
    let hero = object_at(value, path)?;
    let headline = nullable_string_at(field(hero, "headline"), &child(path, "headline"))?;
    let subheadline = nullable_string_at(field(hero, "subheadline"), &child(path, "subheadline"))?;

    let cta_path = child(path, "cta");
    let cta = object_at(field(hero, "cta"), &cta_path)?;
    let cta = HeroCta {
        text: nullable_string_at(field(cta, "text"), &child(&cta_path, "text"))?,
        style_clues: string_array_at(field(cta, "styleClues"), &child(&cta_path, "styleClues"))?,
    };

    let supporting_elements = string_array_at(
        field(hero, "supportingElements"),
        &child(path, "supportingElements"),
    )?;

    Ok(Hero {
        headline,
        subheadline,
        cta,
        supporting_elements,
    })
}

fn ctas_at(value: &Value, path: &str) -> Check<Vec<CallToAction>> {
    let items = value
        .as_array()
        .ok_or_else(|| SchemaViolation::new(path, "an array"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| cta_at(item, &index(path, i)))
        .collect()
}

fn cta_at(value: &Value, path: &str) -> Check<CallToAction> {
    let cta = object_at(value, path)?;
    let prominence = level_at(field(cta, "prominence"), &child(path, "prominence"))?;
    let text = nullable_string_at(field(cta, "text"), &child(path, "text"))?.unwrap_or_default();
    Ok(CallToAction {
        text,
        prominence,
        location_hint: location_hint(field(cta, "locationHint")),
    })
}

fn location_hint(value: &Value) -> String {
    value
        .as_str()
        .unwrap_or(UNSPECIFIED_LOCATION)
        .to_string()
}

fn visual_hierarchy_at(value: &Value, path: &str) -> Check<Vec<String>> {
    let mut entries = string_array_at(value, path)?;
    entries.truncate(MAX_VISUAL_HIERARCHY);
    Ok(entries)
}

fn responsiveness_at(value: &Value, path: &str) -> Check<Responsiveness> {
    let obj = object_at(value, path)?;
    let overall_risk = level_at(field(obj, "overallRisk"), &child(path, "overallRisk"))?;
    let issues = string_array_at(field(obj, "issues"), &child(path, "issues"))?;
    Ok(Responsiveness {
        issues,
        overall_risk,
    })
}

fn performance_signals_at(value: &Value, path: &str) -> Check<PerformanceSignals> {
    let obj = object_at(value, path)?;
    let heavy_media = bool_at(field(obj, "heavyMedia"), &child(path, "heavyMedia"))?;
    let notes = nullable_string_at(field(obj, "notes"), &child(path, "notes"))?;
    Ok(PerformanceSignals { heavy_media, notes })
}

fn differences_at(value: &Value, path: &str) -> Check<Differences> {
    let obj = object_at(value, path)?;
    let flagged = bool_at(field(obj, "flagged"), &child(path, "flagged"))?;
    let notes = string_array_at(field(obj, "notes"), &child(path, "notes"))?;
    Ok(Differences { notes, flagged })
}
