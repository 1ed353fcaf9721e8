//! Result records of the generative-backed stages.
//!
//! Each type here has a degraded variant (see [`Degradable`]) and a lenient
//! constructor from the JSON a model returned. Model answers are untrusted:
//! wrong-typed fields are skipped rather than failing the whole record, and
//! only an answer that is not a JSON object at all is treated as
//! non-conforming.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Rating;

/// A stage result with a well-defined value to fall back to.
pub trait Degradable {
    /// The value returned when the stage's primary computation fails.
    fn degraded() -> Self;
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Tone assumed when none could be extracted.
pub const NEUTRAL_TONE: &str = "neutral";

/// A named entity mentioned in the article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub name: String,
    /// Entity kind as reported by the model (`person`, `organization`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl EntityRef {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) if !name.trim().is_empty() => Some(Self {
                name: name.trim().to_string(),
                kind: None,
            }),
            Value::Object(map) => {
                let name = map
                    .get("name")
                    .or_else(|| map.get("text"))
                    .and_then(Value::as_str)?
                    .trim();
                if name.is_empty() {
                    return None;
                }
                let kind = map
                    .get("type")
                    .or_else(|| map.get("kind"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Some(Self {
                    name: name.to_string(),
                    kind,
                })
            }
            _ => None,
        }
    }
}

/// Topical metadata extracted from the article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataResult {
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub entities: Vec<EntityRef>,
    pub tone: String,
}

impl Degradable for MetadataResult {
    fn degraded() -> Self {
        Self {
            categories: Vec::new(),
            tags: Vec::new(),
            entities: Vec::new(),
            tone: NEUTRAL_TONE.to_string(),
        }
    }
}

impl MetadataResult {
    /// Reads a model answer shaped like
    /// `{suggested_categories, suggested_tags, entities, tone}`.
    ///
    /// Returns `None` when the answer is not a JSON object.
    pub fn from_model_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let tone = map
            .get("tone")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(NEUTRAL_TONE)
            .to_string();
        let entities = map
            .get("entities")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(EntityRef::from_value).collect())
            .unwrap_or_default();

        Some(Self {
            categories: string_list(map.get("suggested_categories")),
            tags: string_list(map.get("suggested_tags")),
            entities,
            tone,
        })
    }
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// Reason recorded on every dimension of a degraded audit.
pub const AUDIT_NOT_COMPLETED: &str = "not completed";

/// One scored dimension of an editorial audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditDimension {
    pub score: Rating,
    pub reason: String,
}

impl AuditDimension {
    fn midpoint(reason: &str) -> Self {
        Self {
            score: Rating::MIDPOINT,
            reason: reason.to_string(),
        }
    }

    /// Accepts `{score, reason}` objects, or a bare number as the score.
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Number(n)) => Self {
                score: n.as_f64().map(Rating::clamped).unwrap_or(Rating::MIDPOINT),
                reason: String::new(),
            },
            Some(Value::Object(map)) => {
                let score = map
                    .get("score")
                    .and_then(number_like)
                    .map(Rating::clamped)
                    .unwrap_or(Rating::MIDPOINT);
                let reason = map
                    .get("reason")
                    .or_else(|| map.get("explanation"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Self { score, reason }
            }
            _ => Self::midpoint(""),
        }
    }
}

/// Editorial quality audit of the article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    pub narrative_quality: AuditDimension,
    pub preliminary_factuality: AuditDimension,
    pub aggressiveness: AuditDimension,
    pub neutrality: AuditDimension,
    pub improvements: Vec<String>,
}

impl Degradable for AuditResult {
    fn degraded() -> Self {
        Self {
            narrative_quality: AuditDimension::midpoint(AUDIT_NOT_COMPLETED),
            preliminary_factuality: AuditDimension::midpoint(AUDIT_NOT_COMPLETED),
            aggressiveness: AuditDimension::midpoint(AUDIT_NOT_COMPLETED),
            neutrality: AuditDimension::midpoint(AUDIT_NOT_COMPLETED),
            improvements: Vec::new(),
        }
    }
}

impl AuditResult {
    /// Reads a model answer shaped like `{narrative_quality,
    /// preliminary_factuality, aggressiveness_level, neutrality_score,
    /// improvements_suggested}`.
    ///
    /// Returns `None` when the answer is not a JSON object.
    pub fn from_model_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        Some(Self {
            narrative_quality: AuditDimension::from_value(map.get("narrative_quality")),
            preliminary_factuality: AuditDimension::from_value(map.get("preliminary_factuality")),
            aggressiveness: AuditDimension::from_value(map.get("aggressiveness_level")),
            neutrality: AuditDimension::from_value(map.get("neutrality_score")),
            improvements: string_list(map.get("improvements_suggested")),
        })
    }
}

// ---------------------------------------------------------------------------
// Humanizer
// ---------------------------------------------------------------------------

/// Output of the humanizer stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanizedText {
    pub text: String,
    /// Local rewrites that changed the text before the model pass.
    pub local_changes: Vec<String>,
    /// Whether the model rewrite was applied.
    pub rewritten: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
