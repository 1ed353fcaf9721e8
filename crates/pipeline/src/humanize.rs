//! Local humanizing rewrites applied before the generative rewrite.
//!
//! The rules only smooth mechanical phrasing; the model pass does the rest.
//! Word variation draws from a caller-supplied RNG so a seeded generator
//! gives reproducible output.

use std::sync::LazyLock;

use rand::seq::SliceRandom;
use rand::Rng;
use regex::{Captures, Regex};

/// A word must occur more often than this before it is varied.
const MAX_REPETITIONS: usize = 2;

static PASSIVE: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)is\s+being\s+(\w+)", "is ${1}"),
        (r"(?i)has\s+been\s+(\w+)", "has ${1}"),
        (r"(?i)was\s+(\w+)ed\s+by", "to"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

static CONTRACTIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\bis\s+not\b", "isn't"),
        (r"(?i)\bwill\s+not\b", "won't"),
        (r"(?i)\bcannot\b", "can't"),
        (r"(?i)\bwould\s+not\b", "wouldn't"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

static VARIED_WORDS: LazyLock<Vec<(&'static str, Regex, &'static [&'static str])>> =
    LazyLock::new(|| {
        let table: [(&'static str, &'static [&'static str]); 3] = [
            ("important", &["crucial", "significant", "vital", "key"]),
            ("said", &["mentioned", "noted", "stated", "explained"]),
            ("very", &["quite", "really", "extremely"]),
        ];
        table
            .into_iter()
            .map(|(word, alternatives)| {
                let pattern = Regex::new(&format!(r"(?i)\b{word}\b")).unwrap();
                (word, pattern, alternatives)
            })
            .collect()
    });

/// Text after the local rules, with a note per rule family that changed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRewrite {
    pub text: String,
    pub changes: Vec<String>,
}

/// Applies passive-voice simplification, contractions, and word variation.
pub fn humanize_locally<R: Rng + ?Sized>(text: &str, rng: &mut R) -> LocalRewrite {
    let mut changes = Vec::new();

    let mut current = text.to_string();
    for (pattern, replacement) in PASSIVE.iter() {
        current = pattern.replace_all(&current, *replacement).into_owned();
    }
    if current != text {
        changes.push("simplified passive constructions".to_string());
    }

    let before = current.clone();
    for (pattern, replacement) in CONTRACTIONS.iter() {
        current = pattern.replace_all(&current, *replacement).into_owned();
    }
    if current != before {
        changes.push("applied contractions".to_string());
    }

    for (word, pattern, alternatives) in VARIED_WORDS.iter() {
        if pattern.find_iter(&current).count() <= MAX_REPETITIONS {
            continue;
        }
        current = vary_every_second(&current, pattern, alternatives, rng);
        changes.push(format!("varied repeated '{word}'"));
    }

    LocalRewrite {
        text: current,
        changes,
    }
}

fn vary_every_second<R: Rng + ?Sized>(
    text: &str,
    pattern: &Regex,
    alternatives: &[&str],
    rng: &mut R,
) -> String {
    let mut seen = 0usize;
    pattern
        .replace_all(text, |caps: &Captures<'_>| {
            seen += 1;
            if seen % 2 == 0 {
                if let Some(alternative) = alternatives.choose(rng) {
                    return (*alternative).to_string();
                }
            }
            caps[0].to_string()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn passive_patterns_are_simplified() {
        let out = humanize_locally("The bridge is being repaired and has been closed.", &mut rng());
        assert_eq!(out.text, "The bridge is repaired and has closed.");
        assert_eq!(out.changes, vec!["simplified passive constructions"]);
    }

    #[test]
    fn agent_passive_collapses_to_to() {
        let out = humanize_locally("The law was signed by the governor.", &mut rng());
        assert_eq!(out.text, "The law to the governor.");
    }

    #[test]
    fn contractions_are_applied_case_insensitively() {
        let out = humanize_locally("It IS NOT over. We cannot stop and will not wait.", &mut rng());
        assert_eq!(out.text, "It isn't over. We can't stop and won't wait.");
        assert_eq!(out.changes, vec!["applied contractions"]);
    }

    #[test]
    fn repeated_words_vary_every_second_occurrence() {
        let text = "He said yes. She said no. They said maybe. We said nothing.";
        let out = humanize_locally(text, &mut rng());
        let words: Vec<&str> = out.text.split_whitespace().collect();
        assert_eq!(words[1], "said");
        assert!(["mentioned", "noted", "stated", "explained"].contains(&words[4]));
        assert_eq!(words[7], "said");
        assert!(["mentioned", "noted", "stated", "explained"].contains(&words[10]));
        assert_eq!(out.changes, vec!["varied repeated 'said'"]);
    }

    #[test]
    fn two_occurrences_are_left_alone() {
        let text = "A very long day and a very short night.";
        assert_eq!(humanize_locally(text, &mut rng()).text, text);
    }

    #[test]
    fn same_seed_gives_same_output() {
        let text = "very very very very very very";
        let first = humanize_locally(text, &mut rng());
        let second = humanize_locally(text, &mut rng());
        assert_eq!(first, second);
    }

    #[test]
    fn untouched_text_reports_no_changes() {
        let out = humanize_locally("Rain fell over the valley.", &mut rng());
        assert!(out.changes.is_empty());
    }
}
