//! Heuristic fact-checking: a rule engine with no external calls.
//!
//! The checker does not verify claims. It looks for language and numeric
//! patterns that correlate with unreliable copy and condenses them into a
//! risk score:
//!
//! ```text
//! risk = 0.15 × red_flags + 0.30 × future_date + 0.20 × no_citations   (clamped to [0, 1])
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::UnitScore;

/// More `!` than this raises an excessive-punctuation flag.
const MAX_EXCLAMATIONS: usize = 5;
/// More all-caps tokens than this raises an excessive-caps flag.
const MAX_CAPS_TOKENS: usize = 3;
/// Numbers above this are reported as suspiciously large.
const LARGE_NUMBER: f64 = 1_000_000.0;
/// A numeric string appearing more often than this is reported as repeated.
const MAX_REPEATS: usize = 2;

static ABSOLUTE_CLAIMS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)always\s+\w+",
        r"(?i)never\s+\w+",
        r"(?i)everyone\s+knows",
        r"(?i)obviously",
        r"(?i)clearly",
        r"(?i)definitely",
    ]
    .into_iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static CAPS_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z]{3,}\b").unwrap());
static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\d{1,2}[/-]?\d{1,2}[/-]?\d{2,4}|\w+\s+\d{1,2},?\s+\d{4})\b").unwrap()
});
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").unwrap());
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+(?:\.\d+)?\b").unwrap());
static CITATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[\w\s]+\]").unwrap());

/// A language or structure pattern associated with unreliable claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RedFlag {
    /// Absolute phrasing such as "everyone knows" or "never fails".
    AbsoluteClaim {
        text: String,
        /// Character offset of the match.
        position: usize,
    },
    ExcessivePunctuation { count: usize },
    ExcessiveCaps { count: usize },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DateConsistency {
    pub dates_found: Vec<String>,
    /// A year later than next year was mentioned.
    pub is_future_date: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatedNumber {
    pub number: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NumericalConsistency {
    pub numbers_found: usize,
    pub large_numbers: Vec<f64>,
    pub repeated_numbers: Vec<RepeatedNumber>,
}

/// Output of the fact-checking stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckResult {
    pub red_flags: Vec<RedFlag>,
    pub date_consistency: DateConsistency,
    pub numerical_consistency: NumericalConsistency,
    pub citation_count: usize,
    pub risk_score: UnitScore,
    /// Human-readable summary of the date and number findings.
    pub warnings: Vec<String>,
}

/// The heuristic fact-checker.
#[derive(Debug, Clone, Copy, Default)]
pub struct FactChecker;

impl FactChecker {
    pub fn new() -> Self {
        Self
    }

    /// Checks `text`, treating `current_year` as "now" for date plausibility.
    pub fn check(&self, text: &str, current_year: i32) -> FactCheckResult {
        let red_flags = detect_red_flags(text);
        let date_consistency = check_dates(text, current_year);
        let numerical_consistency = check_numbers(text);
        let citation_count = count_citations(text);
        let risk_score = risk_score(red_flags.len(), date_consistency.is_future_date, citation_count);

        let mut warnings = date_consistency.warnings.clone();
        warnings.extend(
            numerical_consistency
                .large_numbers
                .iter()
                .map(|n| format!("Unusually large number: {n}")),
        );
        warnings.extend(
            numerical_consistency
                .repeated_numbers
                .iter()
                .map(|r| format!("Number {} repeated {} times", r.number, r.count)),
        );

        debug!(
            red_flags = red_flags.len(),
            citations = citation_count,
            future_date = date_consistency.is_future_date,
            risk_score = risk_score.as_f64(),
            "fact check completed"
        );

        FactCheckResult {
            red_flags,
            date_consistency,
            numerical_consistency,
            citation_count,
            risk_score,
            warnings,
        }
    }
}

/// Combines the findings into a risk score in `[0, 1]`.
///
/// Computed in hundredths so the result is an exact decimal.
pub fn risk_score(red_flags: usize, future_date: bool, citation_count: usize) -> UnitScore {
    let mut hundredths = 15 * red_flags;
    if future_date {
        hundredths += 30;
    }
    if citation_count == 0 {
        hundredths += 20;
    }
    UnitScore::clamped(hundredths as f64 / 100.0)
}

fn detect_red_flags(text: &str) -> Vec<RedFlag> {
    let mut flags: Vec<RedFlag> = ABSOLUTE_CLAIMS
        .iter()
        .flat_map(|pattern| pattern.find_iter(text))
        .map(|m| RedFlag::AbsoluteClaim {
            text: m.as_str().to_string(),
            position: text[..m.start()].chars().count(),
        })
        .collect();

    let exclamations = text.matches('!').count();
    if exclamations > MAX_EXCLAMATIONS {
        flags.push(RedFlag::ExcessivePunctuation {
            count: exclamations,
        });
    }

    let caps = CAPS_TOKEN.find_iter(text).count();
    if caps > MAX_CAPS_TOKENS {
        flags.push(RedFlag::ExcessiveCaps { count: caps });
    }

    flags
}

fn check_dates(text: &str, current_year: i32) -> DateConsistency {
    let mut consistency = DateConsistency::default();

    for m in DATE.find_iter(text) {
        let date = m.as_str();
        consistency.dates_found.push(date.to_string());

        let year = YEAR
            .find(date)
            .and_then(|y| y.as_str().parse::<i32>().ok());
        if let Some(year) = year {
            if year > current_year + 1 {
                consistency.is_future_date = true;
                consistency
                    .warnings
                    .push(format!("Future date detected: {date}"));
            }
        }
    }

    consistency
}

fn check_numbers(text: &str) -> NumericalConsistency {
    let numbers: Vec<&str> = NUMBER.find_iter(text).map(|m| m.as_str()).collect();

    let large_numbers = numbers
        .iter()
        .filter_map(|n| n.parse::<f64>().ok())
        .filter(|n| *n > LARGE_NUMBER)
        .collect();

    // First-seen order, so the report reads in document order.
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for n in &numbers {
        let count = counts.entry(n).or_insert(0);
        if *count == 0 {
            order.push(n);
        }
        *count += 1;
    }
    let repeated_numbers = order
        .into_iter()
        .filter_map(|n| {
            let count = counts[n];
            (count > MAX_REPEATS).then(|| RepeatedNumber {
                number: n.to_string(),
                count,
            })
        })
        .collect();

    NumericalConsistency {
        numbers_found: numbers.len(),
        large_numbers,
        repeated_numbers,
    }
}

fn count_citations(text: &str) -> usize {
    CITATION.find_iter(text).count()
}
