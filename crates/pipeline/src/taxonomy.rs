//! Category and tag normalization, and the external term-ID cache.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use deunicode::deunicode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::TermId;

/// Canonical term and the (ASCII, lower-case) forms that map onto it.
const BASE_SYNONYMS: [(&str, &[&str]); 8] = [
    ("politica", &["politica", "politicas", "politics"]),
    ("deporte", &["deportes", "sport", "sports", "athletic"]),
    ("tecnologia", &["tecnologia", "technology", "tech"]),
    ("economia", &["economia", "economy", "economic"]),
    ("salud", &["health", "sanidad", "medica"]),
    ("educacion", &["educacion", "education", "escuela"]),
    ("cultura", &["cultura", "cultural", "arte"]),
    ("ambiente", &["environment", "ambiental", "ecologia"]),
];

/// Which list a term came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    Category,
    Tag,
}

/// One input term that came out of normalization in a different form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedNormalization {
    pub original: String,
    /// The form it was normalized to, or the earlier term it duplicated.
    pub normalized: String,
    pub kind: TermKind,
}

/// Output of the taxonomy normalizer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedTaxonomy {
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub applied_normalizations: Vec<AppliedNormalization>,
}

/// Transliterates to ASCII, deduplicates, canonicalizes and title-cases
/// taxonomy terms.
///
/// Output terms are plain ASCII, so normalizing an already normalized list returns it unchanged.
#[derive(Debug, Clone)]
pub struct TaxonomyNormalizer {
    synonyms: HashMap<String, String>,
}

impl Default for TaxonomyNormalizer {
    fn default() -> Self {
        let synonyms = BASE_SYNONYMS
            .iter()
            .flat_map(|(canonical, forms)| {
                forms
                    .iter()
                    .map(move |form| (form.to_string(), canonical.to_string()))
            })
            .collect();
        Self { synonyms }
    }
}

impl TaxonomyNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&self, categories: &[String], tags: &[String]) -> NormalizedTaxonomy {
        let mut applied = Vec::new();
        let categories = self.normalize_list(categories, TermKind::Category, &mut applied);
        let tags = self.normalize_list(tags, TermKind::Tag, &mut applied);

        debug!(
            categories = categories.len(),
            tags = tags.len(),
            changes = applied.len(),
            "taxonomy normalized"
        );

        NormalizedTaxonomy {
            categories,
            tags,
            applied_normalizations: applied,
        }
    }

    fn normalize_list(
        &self,
        items: &[String],
        kind: TermKind,
        applied: &mut Vec<AppliedNormalization>,
    ) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut index_by_key: HashMap<String, usize> = HashMap::new();

        for item in items {
            let ascii = deunicode(item)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if ascii.is_empty() {
                continue;
            }
            let canonical = self.canonical(&ascii);
            let key = canonical.to_lowercase();

            let normalized = match index_by_key.get(&key) {
                Some(&existing) => out[existing].clone(),
                None => {
                    let titled = title_case(&canonical);
                    index_by_key.insert(key, out.len());
                    out.push(titled.clone());
                    titled
                }
            };

            if normalized != *item {
                applied.push(AppliedNormalization {
                    original: item.clone(),
                    normalized,
                    kind,
                });
            }
        }
        out
    }

    fn canonical(&self, term: &str) -> String {
        self.synonyms
            .get(&term.to_lowercase())
            .cloned()
            .unwrap_or_else(|| term.to_string())
    }
}

/// Upper-cases the first cased letter of every run of letters and lower-cases
/// the rest, so `"o'neil 3d"` becomes `"O'Neil 3D"`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_cased = false;
    for ch in text.chars() {
        let cased = ch.is_lowercase() || ch.is_uppercase();
        if cased && previous_cased {
            out.extend(ch.to_lowercase());
        } else if cased {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        previous_cased = cased;
    }
    out
}

// ---------------------------------------------------------------------------
// External ID cache
// ---------------------------------------------------------------------------

/// Case-insensitive map from term names to publishing-target IDs, with
/// per-entry expiry.
///
/// Safe to share between concurrent runs.
#[derive(Debug)]
pub struct TermIdCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (TermId, Instant)>>,
}

impl TermIdCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached ID, or `None` if absent or expired.
    pub fn get(&self, name: &str) -> Option<TermId> {
        let key = name.trim().to_lowercase();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(&key) {
            Some((id, stored_at)) if stored_at.elapsed() < self.ttl => Some(*id),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Stores `id` under `name`, dropping every expired entry first.
    pub fn insert(&self, name: &str, id: TermId) {
        let key = name.trim().to_lowercase();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, (_, stored_at)| stored_at.elapsed() < self.ttl);
        entries.insert(key, (id, Instant::now()));
    }

    /// Replaces the whole mapping.
    pub fn set_mapping<I, S>(&self, mapping: I)
    where
        I: IntoIterator<Item = (S, TermId)>,
        S: AsRef<str>,
    {
        let now = Instant::now();
        let fresh: HashMap<_, _> = mapping
            .into_iter()
            .map(|(name, id)| (name.as_ref().trim().to_lowercase(), (id, now)))
            .collect();
        *self.entries.lock().unwrap_or_else(|e| e.into_inner()) = fresh;
    }

    pub fn invalidate(&self, name: &str) {
        let key = name.trim().to_lowercase();
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&key);
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn synonyms_collapse_to_one_canonical_term() {
        let normalizer = TaxonomyNormalizer::new();
        let result = normalizer.normalize(&strings(&["Política", "politics", "Sports"]), &[]);
        assert_eq!(result.categories, vec!["Politica", "Deporte"]);
    }

    #[test]
    fn accents_whitespace_and_case_are_normalized() {
        let normalizer = TaxonomyNormalizer::new();
        let result = normalizer.normalize(
            &[],
            &strings(&["  elecciones   municipales ", "MÉXICO", "", "   "]),
        );
        assert_eq!(result.tags, vec!["Elecciones Municipales", "Mexico"]);
    }

    #[test]
    fn first_occurrence_wins_on_duplicates() {
        let normalizer = TaxonomyNormalizer::new();
        let result = normalizer.normalize(&strings(&["budget", "Housing", "BUDGET"]), &[]);
        assert_eq!(result.categories, vec!["Budget", "Housing"]);
        let dup = result
            .applied_normalizations
            .iter()
            .find(|n| n.original == "BUDGET")
            .unwrap();
        assert_eq!(dup.normalized, "Budget");
        assert_eq!(dup.kind, TermKind::Category);
    }

    #[test]
    fn normalization_is_idempotent() {
        let normalizer = TaxonomyNormalizer::new();
        let categories = strings(&["Tecnología", "tech", "  salud ", "Arte", "o'neil 3d"]);
        let tags = strings(&["Economía", "economy", "Ecologia", "agua"]);

        let once = normalizer.normalize(&categories, &tags);
        let twice = normalizer.normalize(&once.categories, &once.tags);
        assert_eq!(once.categories, twice.categories);
        assert_eq!(once.tags, twice.tags);
        assert!(twice.applied_normalizations.is_empty());
    }

    #[test]
    fn letters_without_decomposition_are_transliterated() {
        let normalizer = TaxonomyNormalizer::new();
        let once = normalizer.normalize(&strings(&["Straße", "Łódź", "Ærø", "ß"]), &[]);
        assert_eq!(once.categories, vec!["Strasse", "Lodz", "Aero", "Ss"]);
        assert!(once.categories.iter().all(|c| c.is_ascii()));

        let twice = normalizer.normalize(&once.categories, &[]);
        assert_eq!(twice.categories, once.categories);
        assert!(twice.applied_normalizations.is_empty());
    }

    #[test]
    fn unchanged_terms_are_not_recorded() {
        let normalizer = TaxonomyNormalizer::new();
        let result = normalizer.normalize(&strings(&["Housing"]), &strings(&["Tech"]));
        assert_eq!(result.applied_normalizations.len(), 1);
        assert_eq!(result.applied_normalizations[0].normalized, "Tecnologia");
        assert_eq!(result.applied_normalizations[0].kind, TermKind::Tag);
    }

    #[test]
    fn title_case_follows_letter_runs() {
        assert_eq!(title_case("o'neil 3d"), "O'Neil 3D");
        assert_eq!(title_case("NEW yORK"), "New York");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn cache_lookups_are_case_insensitive() {
        let cache = TermIdCache::new(Duration::from_secs(60));
        cache.insert("Politica", TermId::new(4));
        assert_eq!(cache.get("POLITICA"), Some(TermId::new(4)));
        assert_eq!(cache.get("Salud"), None);
    }

    #[test]
    fn cache_entries_expire() {
        let cache = TermIdCache::new(Duration::ZERO);
        cache.insert("Politica", TermId::new(4));
        assert_eq!(cache.get("Politica"), None);
    }

    #[test]
    fn insert_prunes_expired_entries() {
        let cache = TermIdCache::new(Duration::ZERO);
        for (i, name) in ["Politica", "Salud", "Cultura"].iter().enumerate() {
            cache.insert(name, TermId::new(i as u64));
        }
        let entries = cache.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("cultura"));
    }

    #[test]
    fn cache_supports_invalidation_and_replacement() {
        let cache = TermIdCache::new(Duration::from_secs(60));
        cache.set_mapping([("Salud", TermId::new(1)), ("Cultura", TermId::new(2))]);
        cache.invalidate("salud");
        assert_eq!(cache.get("Salud"), None);
        assert_eq!(cache.get("cultura"), Some(TermId::new(2)));
        cache.clear();
        assert_eq!(cache.get("cultura"), None);
    }
}
