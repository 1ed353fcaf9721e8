//! Search-optimization results and their local computations.
//!
//! The headline, subheadings, meta description and structured markup come
//! from the generative model when it answers; every one of them has a local
//! fallback defined here. Keyword density and the recommendations are always
//! computed locally.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ports::strip_code_fences;

pub const FALLBACK_HEADLINE: &str = "News Article";
pub const DEFAULT_PRIMARY_ENTITY: &str = "news";

const HEADLINE_FALLBACK_CHARS: usize = 60;
const MAX_HEADLINE_CHARS: usize = 70;
const MIN_META_CHARS: usize = 120;
const MAX_META_CHARS: usize = 160;
const MAX_SUBHEADINGS: usize = 4;
const SCHEMA_BODY_CHARS: usize = 100;
const OPTIMAL_DENSITY: (f64, f64) = (1.5, 3.0);

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]").unwrap());
static CAPITALIZED_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z]\w+\b").unwrap());
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*•]+\s*|\d+[.)]\s*)").unwrap());

/// How often the primary entity appears in the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordDensity {
    pub primary_entity: String,
    pub occurrences: usize,
    pub total_words: usize,
    /// Percentage of words, rounded to two decimals.
    pub density_percent: f64,
    pub is_optimal: bool,
}

/// Output of the SEO stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoResult {
    pub optimized_text: String,
    pub headline: String,
    pub subheadings: Vec<String>,
    pub meta_description: String,
    /// JSON-LD `NewsArticle` object.
    pub schema_markup: Value,
    pub keyword_density: KeywordDensity,
    pub recommendations: Vec<String>,
}

/// First sentence of `text`, cut to 60 characters.
pub fn fallback_headline(text: &str) -> String {
    let first = SENTENCE_END
        .split(text)
        .next()
        .map(str::trim)
        .unwrap_or_default();
    if first.is_empty() {
        FALLBACK_HEADLINE.to_string()
    } else {
        first.chars().take(HEADLINE_FALLBACK_CHARS).collect()
    }
}

/// Trims whitespace and wrapping quotes from a model headline.
///
/// Returns `None` when nothing is left.
pub fn clean_headline(raw: &str) -> Option<String> {
    let cleaned = raw.trim().trim_matches('"').trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Reads subheadings from a model answer.
///
/// A JSON array of strings is taken as-is; anything else is read as one
/// suggestion per non-empty line with list markers stripped. At most four
/// line-based suggestions are kept.
pub fn parse_subheadings(raw: &str) -> Vec<String> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(strip_code_fences(raw)) {
        return items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| LIST_MARKER.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .take(MAX_SUBHEADINGS)
        .collect()
}

/// Truncates `text` to at most 160 characters without splitting a word.
///
/// Text that has to be cut ends in `...`.
pub fn fallback_meta_description(text: &str) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= MAX_META_CHARS {
        return text;
    }

    let budget = MAX_META_CHARS - 3;
    let mut out = String::new();
    for word in text.split(' ') {
        let needed = if out.is_empty() {
            word.chars().count()
        } else {
            out.chars().count() + 1 + word.chars().count()
        };
        if needed > budget {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    if out.is_empty() {
        // A single word longer than the budget.
        out = text.chars().take(budget).collect();
    }
    out.push_str("...");
    out
}

/// Builds a minimal JSON-LD `NewsArticle` object.
pub fn fallback_schema_markup(
    headline: &str,
    description: &str,
    text: &str,
    published: NaiveDateTime,
) -> Value {
    let timestamp = published.format("%Y-%m-%dT%H:%M:%S").to_string();
    let mut body: String = text.chars().take(SCHEMA_BODY_CHARS).collect();
    if text.chars().count() > SCHEMA_BODY_CHARS {
        body.push_str("...");
    }
    json!({
        "@context": "https://schema.org",
        "@type": "NewsArticle",
        "headline": headline,
        "description": description,
        "datePublished": timestamp,
        "dateModified": timestamp,
        "articleBody": body,
    })
}

/// Measures how often the primary entity occurs in `text`.
///
/// Without an explicit entity the first capitalized word is used, falling
/// back to `"news"`.
pub fn keyword_density(text: &str, primary_entity: Option<&str>) -> KeywordDensity {
    let primary_entity = primary_entity
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .or_else(|| CAPITALIZED_WORD.find(text).map(|m| m.as_str().to_string()))
        .unwrap_or_else(|| DEFAULT_PRIMARY_ENTITY.to_string());

    let total_words = text.split_whitespace().count();
    let pattern = format!(r"(?i)\b{}\b", regex::escape(&primary_entity.to_lowercase()));
    let occurrences = Regex::new(&pattern)
        .map(|re| re.find_iter(text).count())
        .unwrap_or(0);

    let density = if total_words > 0 {
        occurrences as f64 / total_words as f64 * 100.0
    } else {
        0.0
    };
    let density_percent = (density * 100.0).round() / 100.0;

    KeywordDensity {
        primary_entity,
        occurrences,
        total_words,
        density_percent,
        is_optimal: (OPTIMAL_DENSITY.0..=OPTIMAL_DENSITY.1).contains(&density),
    }
}

/// Lists the SEO problems visible in a result.
pub fn recommendations(
    headline: &str,
    subheadings: &[String],
    meta_description: &str,
    schema_markup: &Value,
    density: &KeywordDensity,
) -> Vec<String> {
    let mut out = Vec::new();

    if density.density_percent < OPTIMAL_DENSITY.0 {
        out.push(format!(
            "Increase keyword density for '{}' (current: {}%)",
            density.primary_entity, density.density_percent
        ));
    } else if density.density_percent > OPTIMAL_DENSITY.1 {
        out.push(format!(
            "Reduce keyword density to avoid over-optimization (current: {}%)",
            density.density_percent
        ));
    }

    if headline.chars().count() > MAX_HEADLINE_CHARS {
        out.push("Headline is too long. Aim for under 70 characters.".to_string());
    }

    let meta_chars = meta_description.chars().count();
    if meta_chars < MIN_META_CHARS {
        out.push("Meta description is too short. Aim for 120-160 characters.".to_string());
    } else if meta_chars > MAX_META_CHARS {
        out.push("Meta description is too long. Keep it under 160 characters.".to_string());
    }

    if subheadings.is_empty() {
        out.push("Add subheadings to improve structure.".to_string());
    }

    let markup_empty = match schema_markup {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if markup_empty {
        out.push("Structured markup is missing.".to_string());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn headline_falls_back_to_first_sentence() {
        assert_eq!(fallback_headline("Floods hit the coast. More rain due."), "Floods hit the coast");
        assert_eq!(fallback_headline(""), FALLBACK_HEADLINE);
        assert_eq!(fallback_headline("...").as_str(), FALLBACK_HEADLINE);
        assert_eq!(fallback_headline(&"x".repeat(100)).chars().count(), 60);
    }

    #[test]
    fn headline_quotes_are_removed() {
        assert_eq!(clean_headline("  \"Floods hit\"\n").as_deref(), Some("Floods hit"));
        assert_eq!(clean_headline(" \"\" "), None);
    }

    #[test]
    fn subheadings_accept_json_or_lines() {
        let fenced = "```json\n[\"Background\", \"The vote\", 3]\n```";
        assert_eq!(parse_subheadings(fenced), vec!["Background", "The vote"]);

        let lines = "- Background\n\n1. The vote\n2) Reaction\n* Next steps\nExtra";
        assert_eq!(
            parse_subheadings(lines),
            vec!["Background", "The vote", "Reaction", "Next steps"]
        );
    }

    #[test]
    fn meta_fallback_respects_word_boundaries() {
        let text = "word ".repeat(60);
        let meta = fallback_meta_description(&text);
        assert!(meta.chars().count() <= 160);
        assert!(meta.ends_with("word..."));

        assert_eq!(fallback_meta_description("Short text."), "Short text.");
    }

    #[test]
    fn schema_fallback_is_a_news_article() {
        let schema = fallback_schema_markup("Floods", "Rain", "Body text", noon());
        assert_eq!(schema["@type"], "NewsArticle");
        assert_eq!(schema["headline"], "Floods");
        assert_eq!(schema["datePublished"], "2026-03-14T12:00:00");
        assert_eq!(schema["articleBody"], "Body text");
    }

    #[test]
    fn density_uses_given_entity_case_insensitively() {
        let text = "Budget talks resumed. The budget is late. Budget hawks object.";
        let density = keyword_density(text, Some("Budget"));
        assert_eq!(density.occurrences, 3);
        assert_eq!(density.total_words, 10);
        assert_eq!(density.density_percent, 30.0);
        assert!(!density.is_optimal);
    }

    #[test]
    fn density_falls_back_to_first_capitalized_word_then_news() {
        assert_eq!(keyword_density("the Council met", None).primary_entity, "Council");
        assert_eq!(
            keyword_density("all lower case", None).primary_entity,
            DEFAULT_PRIMARY_ENTITY
        );
        assert_eq!(keyword_density("", None).density_percent, 0.0);
    }

    #[test]
    fn density_rounds_to_two_decimals() {
        let text = format!("Council {}", "word ".repeat(49));
        let density = keyword_density(&text, None);
        assert_eq!(density.density_percent, 2.0);
        assert!(density.is_optimal);

        let text = format!("Council {}", "word ".repeat(2));
        assert_eq!(keyword_density(&text, None).density_percent, 33.33);
    }

    #[test]
    fn recommendations_cover_each_problem() {
        let density = keyword_density("Council met", None);
        let schema = json!({"@type": "NewsArticle"});
        let recs = recommendations(&"h".repeat(71), &[], "too short", &schema, &density);
        assert_eq!(recs.len(), 4);
        assert!(recs[0].starts_with("Reduce keyword density"));
        assert!(recs[1].starts_with("Headline is too long"));
        assert!(recs[2].starts_with("Meta description is too short"));
        assert_eq!(recs[3], "Add subheadings to improve structure.");
    }

    #[test]
    fn empty_markup_is_reported() {
        let density = keyword_density(&format!("Council {}", "word ".repeat(49)), None);
        let meta = "m".repeat(130);
        let recs = recommendations("Fine", &["One".into()], &meta, &Value::Null, &density);
        assert_eq!(recs, vec!["Structured markup is missing."]);
    }
}
