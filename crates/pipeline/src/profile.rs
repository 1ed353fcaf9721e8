//! The taxonomy learning profile and its learning rules.
//!
//! The profile is a plain document: every operation here mutates it in
//! memory only. Loading, persisting and serializing concurrent updates are
//! the autolearner's job.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Usage-pattern similarity above which two categories are synonym candidates.
pub const DEFAULT_SYNONYM_THRESHOLD: f64 = 0.75;
/// Usage-pattern similarity above which two categories are merged.
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.85;

/// Smallest denominator used when comparing average traffic.
const MIN_TRAFFIC: f64 = 0.001;
/// Association weight that maps to full recommendation confidence.
const FULL_CONFIDENCE_WEIGHT: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryStats {
    pub count: u64,
    pub traffic_total: f64,
    pub last_used: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TagStats {
    pub count: u64,
    pub traffic_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymCandidate {
    pub candidate: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileStatistics {
    pub total_articles: u64,
    /// Number of merge passes that changed the profile.
    pub learning_cycles: u64,
}

/// A category folded into another by [`TaxonomyProfile::merge_similar`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMerge {
    pub merged: String,
    pub into: String,
}

/// A tag suggested for a category, from learned associations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecommendation {
    pub tag: String,
    /// In `[0, 1]`.
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub total_categories: usize,
    pub total_tags: usize,
    pub total_articles_learned: u64,
    pub learning_cycles: u64,
    pub last_update: Timestamp,
}

/// Learned usage statistics for categories and tags, keyed by lower-cased name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyProfile {
    pub last_update: Timestamp,
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryStats>,
    #[serde(default)]
    pub tags: BTreeMap<String, TagStats>,
    /// Result of the latest synonym discovery.
    #[serde(default)]
    pub synonyms: BTreeMap<String, Vec<SynonymCandidate>>,
    /// Category → tag → co-occurrence weight.
    #[serde(default)]
    pub associations: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    pub statistics: ProfileStatistics,
}

impl TaxonomyProfile {
    /// An empty profile.
    pub fn new(now: Timestamp) -> Self {
        Self {
            last_update: now,
            categories: BTreeMap::new(),
            tags: BTreeMap::new(),
            synonyms: BTreeMap::new(),
            associations: BTreeMap::new(),
            statistics: ProfileStatistics::default(),
        }
    }

    /// Records one article's categories and tags.
    ///
    /// Every category×tag pair gains 1.0 association weight.
    pub fn learn(&mut self, categories: &[String], tags: &[String], traffic_score: f64, now: Timestamp) {
        let categories: Vec<String> = categories.iter().map(|c| c.to_lowercase()).collect();
        let tags: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();

        for category in &categories {
            let stats = self.categories.entry(category.clone()).or_default();
            stats.count += 1;
            stats.traffic_total += traffic_score;
            stats.last_used = Some(now);
        }
        for tag in &tags {
            let stats = self.tags.entry(tag.clone()).or_default();
            stats.count += 1;
            stats.traffic_total += traffic_score;
        }
        for category in &categories {
            let weights = self.associations.entry(category.clone()).or_default();
            for tag in &tags {
                *weights.entry(tag.clone()).or_insert(0.0) += 1.0;
            }
        }

        self.statistics.total_articles += 1;
        self.last_update = now;
    }

    /// Compares the average traffic per use of two categories.
    ///
    /// Returns `min / max` of the two averages, 0 when both are zero or either
    /// category is unknown.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let (Some(a), Some(b)) = (self.categories.get(a), self.categories.get(b)) else {
            return 0.0;
        };
        let average = |s: &CategoryStats| s.traffic_total / s.count.max(1) as f64;
        let (ta, tb) = (average(a), average(b));
        if ta == 0.0 && tb == 0.0 {
            return 0.0;
        }
        ta.min(tb) / ta.max(tb).max(MIN_TRAFFIC)
    }

    /// Finds category pairs whose similarity exceeds `threshold` and stores
    /// them as synonym candidates, replacing the previous discovery.
    pub fn discover_synonyms(&mut self, threshold: f64) -> &BTreeMap<String, Vec<SynonymCandidate>> {
        let names: Vec<&String> = self.categories.keys().collect();
        let mut found: BTreeMap<String, Vec<SynonymCandidate>> = BTreeMap::new();

        for (i, first) in names.iter().enumerate() {
            for second in &names[i + 1..] {
                let confidence = self.similarity(first, second);
                if confidence > threshold {
                    found
                        .entry((*first).clone())
                        .or_default()
                        .push(SynonymCandidate {
                            candidate: (*second).clone(),
                            confidence,
                        });
                }
            }
        }

        self.synonyms = found;
        &self.synonyms
    }

    /// Merges every category into the first earlier category whose similarity
    /// exceeds `threshold`.
    ///
    /// Counts and traffic are summed, associations folded into the target, and
    /// the source removed. A category already merged away takes no further
    /// part. Increments the learning-cycle counter when anything merged.
    pub fn merge_similar(&mut self, threshold: f64, now: Timestamp) -> Vec<CategoryMerge> {
        let names: Vec<String> = self.categories.keys().cloned().collect();
        let mut removed: HashSet<String> = HashSet::new();
        let mut merges = Vec::new();

        for (i, target) in names.iter().enumerate() {
            if removed.contains(target) {
                continue;
            }
            for source in &names[i + 1..] {
                if removed.contains(source) || self.similarity(target, source) <= threshold {
                    continue;
                }
                self.merge_category(target, source);
                removed.insert(source.clone());
                merges.push(CategoryMerge {
                    merged: source.clone(),
                    into: target.clone(),
                });
            }
        }

        if !merges.is_empty() {
            self.statistics.learning_cycles += 1;
            self.last_update = now;
        }
        merges
    }

    fn merge_category(&mut self, target: &str, source: &str) {
        let Some(source_stats) = self.categories.remove(source) else {
            return;
        };
        if let Some(target_stats) = self.categories.get_mut(target) {
            target_stats.count += source_stats.count;
            target_stats.traffic_total += source_stats.traffic_total;
            target_stats.last_used = target_stats.last_used.max(source_stats.last_used);
        }
        if let Some(source_weights) = self.associations.remove(source) {
            let target_weights = self.associations.entry(target.to_string()).or_default();
            for (tag, weight) in source_weights {
                *target_weights.entry(tag).or_insert(0.0) += weight;
            }
        }
    }

    /// Suggests tags for `category`, most strongly associated first.
    pub fn recommendations(&self, category: &str) -> Vec<TagRecommendation> {
        let Some(weights) = self.associations.get(&category.to_lowercase()) else {
            return Vec::new();
        };
        let mut out: Vec<TagRecommendation> = weights
            .iter()
            .map(|(tag, weight)| TagRecommendation {
                tag: tag.clone(),
                confidence: (weight / FULL_CONFIDENCE_WEIGHT).min(1.0),
            })
            .collect();
        out.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        out
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            total_categories: self.categories.len(),
            total_tags: self.tags.len(),
            total_articles_learned: self.statistics.total_articles,
            learning_cycles: self.statistics.learning_cycles,
            last_update: self.last_update,
        }
    }
}
