//! Taxonomy learning: the sole owner of the persisted [`TaxonomyProfile`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use pipeline::profile::{CategoryMerge, ProfileSummary, SynonymCandidate, TagRecommendation};
use pipeline::settings::AutolearnSettings;
use pipeline::{PipelineError, ProfileStore, StageName, StoreError, TaxonomyProfile, Timestamp};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::stage::{Stage, Staged};

/// Serializes every load-mutate-save cycle on the profile store.
///
/// Concurrent runs and the out-of-band operations share one instance; the
/// async mutex is held across the whole cycle so no update is lost.
pub struct Autolearner {
    store: Arc<dyn ProfileStore>,
    settings: AutolearnSettings,
    cycle: Mutex<()>,
}

impl Autolearner {
    pub fn new(store: Arc<dyn ProfileStore>, settings: AutolearnSettings) -> Self {
        Self {
            store,
            settings,
            cycle: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &AutolearnSettings {
        &self.settings
    }

    async fn load(&self) -> Result<TaxonomyProfile, StoreError> {
        match self.store.load().await? {
            Some(profile) => Ok(profile),
            None => {
                debug!("no taxonomy profile persisted yet, starting empty");
                Ok(TaxonomyProfile::new(Timestamp::now()))
            }
        }
    }

    /// Records one article's final categories and tags.
    ///
    /// # Errors
    ///
    /// The store's error when the profile cannot be loaded or saved. The
    /// pipeline logs it and carries on.
    pub async fn learn_from_article(
        &self,
        categories: &[String],
        tags: &[String],
        traffic_score: f64,
    ) -> Result<(), StoreError> {
        let _cycle = self.cycle.lock().await;
        let mut profile = self.load().await?;
        profile.learn(categories, tags, traffic_score, Timestamp::now());
        self.store.save(&profile).await?;
        debug!(
            categories = categories.len(),
            tags = tags.len(),
            traffic_score,
            total_articles = profile.statistics.total_articles,
            "taxonomy profile updated"
        );
        Ok(())
    }

    /// Finds categories whose average traffic per use is close, and stores the
    /// result in the profile.
    pub async fn discover_synonyms(
        &self,
    ) -> Result<BTreeMap<String, Vec<SynonymCandidate>>, StoreError> {
        let _cycle = self.cycle.lock().await;
        let mut profile = self.load().await?;
        let synonyms = profile
            .discover_synonyms(self.settings.synonym_threshold)
            .clone();
        self.store.save(&profile).await?;
        info!(categories_with_synonyms = synonyms.len(), "synonym discovery complete");
        Ok(synonyms)
    }

    /// Folds near-identical categories into one another.
    ///
    /// The profile is only rewritten when something was merged.
    pub async fn merge_similar_categories(&self) -> Result<Vec<CategoryMerge>, StoreError> {
        let _cycle = self.cycle.lock().await;
        let mut profile = self.load().await?;
        let merges = profile.merge_similar(self.settings.merge_threshold, Timestamp::now());
        if !merges.is_empty() {
            self.store.save(&profile).await?;
        }
        info!(merged = merges.len(), "category merge complete");
        Ok(merges)
    }

    pub async fn recommend_tags(&self, category: &str) -> Result<Vec<TagRecommendation>, StoreError> {
        let _cycle = self.cycle.lock().await;
        Ok(self.load().await?.recommendations(category))
    }

    pub async fn summary(&self) -> Result<ProfileSummary, StoreError> {
        let _cycle = self.cycle.lock().await;
        Ok(self.load().await?.summary())
    }
}

/// Final taxonomy of a run and the traffic score it earned.
#[derive(Debug, Clone, PartialEq)]
pub struct LearnInput {
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub traffic_score: f64,
}

/// Stage 10: hands the run's taxonomy to the [`Autolearner`].
///
/// A store failure never fails the run; the stage reports degraded and the
/// acknowledgement is `false`.
pub struct AutolearnStage {
    learner: Arc<Autolearner>,
}

impl AutolearnStage {
    pub fn new(learner: Arc<Autolearner>) -> Self {
        Self { learner }
    }
}

#[async_trait]
impl Stage for AutolearnStage {
    type Input = LearnInput;
    type Output = bool;

    fn name(&self) -> StageName {
        StageName::TaxonomyAutolearner
    }

    async fn run(&self, input: &LearnInput) -> Result<Staged<bool>, PipelineError> {
        match self
            .learner
            .learn_from_article(&input.categories, &input.tags, input.traffic_score)
            .await
        {
            Ok(()) => Ok(Staged::completed(true)),
            Err(err) => {
                warn!(error = %err, "taxonomy learning failed");
                Ok(Staged::degraded(false, err.to_string()))
            }
        }
    }
}
