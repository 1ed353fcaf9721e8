//! Deterministic text cleaning, the first stage of every run.
//!
//! The steps run in a fixed order; each is a public function so it can be
//! exercised on its own, and each except whitespace collapsing can be switched
//! off through [`NormalizerOptions`]:
//!
//! 1. [`strip_markup`]
//! 2. [`remove_noise`]
//! 3. [`fold_unicode`] (lossy: `"México"` becomes `"Mexico"`)
//! 4. [`collapse_whitespace`] (always on)
//! 5. [`remove_duplicate_lines`]
//! 6. [`fix_style`]

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use scraper::{Html, Node};
use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_normalization::{char::canonical_combining_class, UnicodeNormalization};

/// Elements whose text content is never visible.
const HIDDEN_ELEMENTS: [&str; 2] = ["script", "style"];

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"http\S+").unwrap());
static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+@\S+").unwrap());
static PUNCTUATION_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[!?]{2,}").unwrap());
static LIST_NUMBERING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\d+\.?\s*").unwrap());
static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").unwrap());
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ([,.;:!?])").unwrap());
static DOUBLE_NEGATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bno\s+es\s+no\b").unwrap());
static SENTENCE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?])\s+([a-z])").unwrap());
static TYPOS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\bteh\b", "the"),
        (r"(?i)\brecieve\b", "receive"),
        (r"(?i)\bdefinately\b", "definitely"),
    ]
    .into_iter()
    .map(|(pattern, fix)| (Regex::new(pattern).unwrap(), fix))
    .collect()
});

/// Switches for the optional cleaning steps. All default to enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerOptions {
    pub strip_markup: bool,
    pub remove_noise: bool,
    /// Accent folding. Disable to keep diacritics intact.
    pub fold_unicode: bool,
    pub remove_duplicates: bool,
    pub fix_style: bool,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self {
            strip_markup: true,
            remove_noise: true,
            fold_unicode: true,
            remove_duplicates: true,
            fix_style: true,
        }
    }
}

/// What the normalizer did to an article body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedText {
    pub text: String,
    pub original_length: usize,
    pub cleaned_length: usize,
}

/// The text-cleaning stage.
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    options: NormalizerOptions,
}

impl TextNormalizer {
    pub fn new(options: NormalizerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &NormalizerOptions {
        &self.options
    }

    /// Runs every enabled step over `text`.
    pub fn clean(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let opts = &self.options;
        let mut text = if opts.strip_markup {
            strip_markup(text)
        } else {
            text.to_string()
        };
        if opts.remove_noise {
            text = remove_noise(&text);
        }
        if opts.fold_unicode {
            text = fold_unicode(&text);
        }
        text = collapse_whitespace(&text);
        if opts.remove_duplicates {
            text = remove_duplicate_lines(&text);
        }
        if opts.fix_style {
            text = fix_style(&text);
        }
        text
    }

    /// Cleans `text` and reports the size change.
    pub fn normalize(&self, text: &str) -> NormalizedText {
        let cleaned = self.clean(text);
        let report = NormalizedText {
            original_length: text.chars().count(),
            cleaned_length: cleaned.chars().count(),
            text: cleaned,
        };
        debug!(
            original_length = report.original_length,
            cleaned_length = report.cleaned_length,
            "text normalized"
        );
        report
    }
}

/// Parses `text` as HTML and returns its visible text.
///
/// Text inside `script` and `style` elements is dropped; entity references
/// are decoded. Plain text passes through unchanged.
pub fn strip_markup(text: &str) -> String {
    let fragment = Html::parse_fragment(text);
    let mut visible = String::with_capacity(text.len());

    for node in fragment.tree.root().descendants() {
        let Node::Text(chunk) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            matches!(ancestor.value(), Node::Element(el) if HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            visible.push_str(&chunk.text);
        }
    }
    visible
}

/// Removes URLs, email addresses, runs of `!`/`?`, and leading list numbers.
pub fn remove_noise(text: &str) -> String {
    let text = URL.replace_all(text, "");
    let text = EMAIL.replace_all(&text, "");
    let text = PUNCTUATION_RUN.replace_all(&text, "!");
    LIST_NUMBERING.replace_all(&text, "").into_owned()
}

/// Decomposes compatibility characters and drops combining marks.
pub fn fold_unicode(text: &str) -> String {
    text.nfkd()
        .filter(|c| canonical_combining_class(*c) == 0)
        .collect()
}

/// Collapses runs of spaces, removes a space before punctuation, and trims.
pub fn collapse_whitespace(text: &str) -> String {
    let text = SPACE_RUN.replace_all(text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    text.trim().to_string()
}

/// Drops blank lines and every line whose trimmed form was already seen.
///
/// The first occurrence of each line is kept, untrimmed, in its original
/// position relative to the other kept lines.
pub fn remove_duplicate_lines(text: &str) -> String {
    let mut seen = HashSet::new();
    text.split('\n')
        .filter(|line| {
            let key = line.trim();
            !key.is_empty() && seen.insert(key)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fixes a double-negative idiom, a few common typos, and sentence casing.
pub fn fix_style(text: &str) -> String {
    let mut text = DOUBLE_NEGATIVE.replace_all(text, "es").into_owned();
    for (pattern, fix) in TYPOS.iter() {
        text = pattern.replace_all(&text, *fix).into_owned();
    }
    SENTENCE_START
        .replace_all(&text, |caps: &Captures<'_>| {
            format!("{} {}", &caps[1], caps[2].to_uppercase())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(TextNormalizer::default().clean(""), "");
    }

    #[test]
    fn collapses_runs_of_spaces() {
        assert_eq!(collapse_whitespace("This  is   a    test"), "This is a test");
    }

    #[test]
    fn removes_space_before_punctuation() {
        assert_eq!(collapse_whitespace("  Hello , world !  "), "Hello, world!");
    }

    #[test]
    fn markup_keeps_visible_text_only() {
        let html = "<p>This is a <b>test</b> text</p>\
                    <script>alert('x')</script><style>p { color: red; }</style>";
        let text = strip_markup(html);
        assert_eq!(text, "This is a test text");
    }

    #[test]
    fn markup_decodes_entities_and_passes_plain_text() {
        assert_eq!(strip_markup("Fish &amp; chips"), "Fish & chips");
        assert_eq!(strip_markup("No tags here."), "No tags here.");
    }

    #[test]
    fn noise_patterns_are_removed() {
        let text = "Visit https://example.com or write to desk@example.com now!!!";
        assert_eq!(remove_noise(text), "Visit  or write to  now!");
    }

    #[test]
    fn list_numbering_is_stripped_per_line() {
        assert_eq!(remove_noise("1. First\n2 Second"), "First\nSecond");
    }

    #[test]
    fn unicode_folding_drops_accents() {
        assert_eq!(fold_unicode("México"), "Mexico");
        assert_eq!(fold_unicode("Michoacán año"), "Michoacan ano");
    }

    #[test]
    fn unicode_folding_can_be_disabled() {
        let normalizer = TextNormalizer::new(NormalizerOptions {
            fold_unicode: false,
            ..NormalizerOptions::default()
        });
        assert_eq!(normalizer.clean("Visita a México."), "Visita a México.");
    }

    #[test]
    fn duplicate_lines_keep_first_occurrence_in_order() {
        let text = "alpha\nbeta\n alpha \ngamma\nbeta\n\ndelta";
        assert_eq!(remove_duplicate_lines(text), "alpha\nbeta\ngamma\ndelta");
    }

    #[test]
    fn style_fixes_typos_and_capitalisation() {
        assert_eq!(
            fix_style("I recieve teh note. it was late!  then it stopped"),
            "I receive the note. It was late! Then it stopped"
        );
        assert_eq!(fix_style("No es no."), "es.");
    }

    #[test]
    fn full_pipeline_deduplicates_paragraphs() {
        let text = "<p>This  is   a    TEST text with    extra spaces!</p>\n\
                    <p>This  is   a    TEST text with    extra spaces!</p>\n\
                    Email: test@example.com";
        let cleaned = TextNormalizer::default().clean(text);
        assert_eq!(cleaned.matches("TEST text").count(), 1);
        assert!(!cleaned.contains("example.com"));
    }

    #[test]
    fn normalize_reports_lengths() {
        let report = TextNormalizer::default().normalize("<b>Hi</b>   there.");
        assert_eq!(report.text, "Hi there.");
        assert_eq!(report.original_length, 18);
        assert_eq!(report.cleaned_length, 9);
    }
}
