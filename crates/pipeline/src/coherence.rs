//! Rule-based coherence verification.
//!
//! Every check works on sentences obtained by splitting on runs of `.`, `!`
//! and `?`. The rules are deliberately shallow and known to over-report
//! (a text containing "impossible" always contains "possible"); they act as
//! a coarse gate, not as a proof of coherence.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::UnitScore;

const TRANSITIONS: [&str; 9] = [
    "however",
    "therefore",
    "thus",
    "furthermore",
    "moreover",
    "in addition",
    "on the other hand",
    "consequently",
    "meanwhile",
];

/// Coherence assumed for texts too short to measure.
const SHORT_TEXT_COHERENCE: f64 = 0.5;
/// Character-set similarity above which two sentences count as duplicates.
const DUPLICATE_SIMILARITY: f64 = 0.8;
const MIN_COHERENCE: f64 = 0.6;
const MAX_LOGICAL_ISSUES: usize = 3;
const SHORT_SENTENCE_WORDS: usize = 3;
const LONG_SENTENCE_WORDS: usize = 30;

pub const EFFECT_BEFORE_CAUSE: &str = "Effect mentioned before cause";
pub const MULTIPLE_TENSE_SHIFTS: &str = "Multiple tense shifts detected";

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());
static NEGATED_STATEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"is\s+not\s+(\w+)").unwrap());
static PAST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)was|were|had").unwrap());
static PRESENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)is|are|has").unwrap());
static FUTURE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)will|shall|going").unwrap());

/// Two sentences whose character sets nearly coincide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicatePair {
    /// The earlier sentence.
    pub original: String,
    /// The later sentence repeating it.
    pub duplicate: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SentenceFlow {
    pub total_sentences: usize,
    /// Mean words per sentence.
    pub avg_length: f64,
    pub too_short: usize,
    pub too_long: usize,
}

/// Output of the coherence verifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub coherence_score: UnitScore,
    pub contradiction_detected: bool,
    pub duplicate_ideas: Vec<DuplicatePair>,
    pub logical_issues: Vec<String>,
    pub sentence_flow: SentenceFlow,
    /// Coherent enough, free of contradictions, and with few logical issues.
    pub overall_valid: bool,
}

/// The coherence verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoherenceVerifier;

impl CoherenceVerifier {
    pub fn new() -> Self {
        Self
    }

    pub fn verify(&self, text: &str) -> VerificationResult {
        let sentences = split_sentences(text);

        let coherence_score = coherence(&sentences);
        let duplicate_ideas = duplicate_ideas(&sentences);
        let contradiction_detected = has_contradiction(text);
        let logical_issues = logical_issues(text);
        let sentence_flow = sentence_flow(&sentences);

        let overall_valid = coherence_score.as_f64() > MIN_COHERENCE
            && !contradiction_detected
            && logical_issues.len() < MAX_LOGICAL_ISSUES;

        debug!(
            coherence = coherence_score.as_f64(),
            contradiction = contradiction_detected,
            duplicates = duplicate_ideas.len(),
            issues = logical_issues.len(),
            overall_valid,
            "verification completed"
        );

        VerificationResult {
            coherence_score,
            contradiction_detected,
            duplicate_ideas,
            logical_issues,
            sentence_flow,
            overall_valid,
        }
    }
}

/// Splits on runs of sentence-ending punctuation; trims and drops empties.
pub fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_END
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn coherence(sentences: &[&str]) -> UnitScore {
    if sentences.len() < 2 {
        return UnitScore::clamped(SHORT_TEXT_COHERENCE);
    }
    let with_transition = sentences
        .iter()
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            TRANSITIONS.iter().any(|t| lower.contains(t))
        })
        .count();
    let denominator = (sentences.len() - 1).max(1);
    UnitScore::clamped(with_transition as f64 / denominator as f64)
}

fn duplicate_ideas(sentences: &[&str]) -> Vec<DuplicatePair> {
    let mut seen: Vec<(&str, String)> = Vec::with_capacity(sentences.len());
    let mut pairs = Vec::new();

    for sentence in sentences {
        let normalized = NON_WORD.replace_all(sentence, "").to_lowercase();
        for (earlier, earlier_normalized) in &seen {
            if char_jaccard(&normalized, earlier_normalized) > DUPLICATE_SIMILARITY {
                pairs.push(DuplicatePair {
                    original: (*earlier).to_string(),
                    duplicate: (*sentence).to_string(),
                });
            }
        }
        seen.push((sentence, normalized));
    }
    pairs
}

/// Jaccard similarity of the character sets of `a` and `b`; 0 if either is empty.
fn char_jaccard(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a: HashSet<char> = a.chars().collect();
    let b: HashSet<char> = b.chars().collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

fn has_contradiction(text: &str) -> bool {
    let negated_then_asserted = NEGATED_STATEMENT.captures_iter(text).any(|caps| {
        let word = regex::escape(&caps[1]);
        Regex::new(&format!(r"is\s+{word}\b"))
            .map(|assertion| assertion.is_match(text))
            .unwrap_or(false)
    });

    negated_then_asserted
        || (text.contains("impossible") && text.contains("possible"))
        || (text.contains("never") && text.contains("always"))
}

fn logical_issues(text: &str) -> Vec<String> {
    let mut issues = Vec::new();

    // Only an actual "therefore ... because" ordering counts; a text that
    // gives a cause without any "therefore" is not flagged.
    if let (Some(effect), Some(cause)) = (text.find("therefore"), text.find("because")) {
        if effect < cause {
            issues.push(EFFECT_BEFORE_CAUSE.to_string());
        }
    }

    if PAST.is_match(text) && PRESENT.is_match(text) && FUTURE.is_match(text) {
        issues.push(MULTIPLE_TENSE_SHIFTS.to_string());
    }

    issues
}

fn sentence_flow(sentences: &[&str]) -> SentenceFlow {
    let word_counts: Vec<usize> = sentences
        .iter()
        .map(|s| s.split_whitespace().count())
        .collect();
    let total_words: usize = word_counts.iter().sum();

    SentenceFlow {
        total_sentences: sentences.len(),
        avg_length: total_words as f64 / sentences.len().max(1) as f64,
        too_short: word_counts.iter().filter(|&&n| n < SHORT_SENTENCE_WORDS).count(),
        too_long: word_counts.iter().filter(|&&n| n > LONG_SENTENCE_WORDS).count(),
    }
}
