//! Auto-publication of ready articles.

use std::sync::Arc;
use std::time::Duration;

use pipeline::outcome::FinalArticle;
use pipeline::taxonomy::TermIdCache;
use pipeline::{PostDraft, PostId, PostStatus, PublishError, PublishingTarget, TermId};
use tracing::{debug, info};

/// Publishes finished articles, resolving category and tag names to target
/// IDs through a pair of TTL caches shared by all runs.
pub struct AutoPublisher {
    target: Arc<dyn PublishingTarget>,
    categories: TermIdCache,
    tags: TermIdCache,
}

impl AutoPublisher {
    pub fn new(target: Arc<dyn PublishingTarget>, cache_ttl: Duration) -> Self {
        Self {
            target,
            categories: TermIdCache::new(cache_ttl),
            tags: TermIdCache::new(cache_ttl),
        }
    }

    /// Drops every cached ID, e.g. after terms were edited on the target.
    pub fn invalidate_cache(&self) {
        self.categories.clear();
        self.tags.clear();
    }

    pub async fn publish(&self, article: &FinalArticle) -> Result<PostId, PublishError> {
        let mut category_refs = Vec::with_capacity(article.categories.len());
        for name in &article.categories {
            category_refs.push(self.category_id(name).await?);
        }
        let mut tag_refs = Vec::with_capacity(article.tags.len());
        for name in &article.tags {
            tag_refs.push(self.tag_id(name).await?);
        }

        let draft = PostDraft {
            title: article.headline.clone(),
            content: article.content.clone(),
            category_refs,
            tag_refs,
            status: PostStatus::Publish,
        };
        let id = self.target.create_post(&draft).await?;
        info!(post_id = id.as_u64(), "article published");
        Ok(id)
    }

    async fn category_id(&self, name: &str) -> Result<TermId, PublishError> {
        if let Some(id) = self.categories.get(name) {
            debug!(name, "category id cached");
            return Ok(id);
        }
        let id = self.target.ensure_category(name).await?;
        self.categories.insert(name, id);
        Ok(id)
    }

    async fn tag_id(&self, name: &str) -> Result<TermId, PublishError> {
        if let Some(id) = self.tags.get(name) {
            debug!(name, "tag id cached");
            return Ok(id);
        }
        let id = self.target.ensure_tag(name).await?;
        self.tags.insert(name, id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct CountingTarget {
        lookups: Mutex<Vec<String>>,
        posts: Mutex<Vec<PostDraft>>,
    }

    #[async_trait]
    impl PublishingTarget for CountingTarget {
        async fn ensure_category(&self, name: &str) -> Result<TermId, PublishError> {
            self.lookups.lock().unwrap().push(format!("category:{name}"));
            Ok(TermId::new(10))
        }

        async fn ensure_tag(&self, name: &str) -> Result<TermId, PublishError> {
            self.lookups.lock().unwrap().push(format!("tag:{name}"));
            Ok(TermId::new(20))
        }

        async fn create_post(&self, draft: &PostDraft) -> Result<PostId, PublishError> {
            self.posts.lock().unwrap().push(draft.clone());
            Ok(PostId::new(99))
        }
    }

    fn article() -> FinalArticle {
        FinalArticle {
            headline: "Budget approved".into(),
            content: "The council approved the budget.".into(),
            meta_description: String::new(),
            schema_markup: json!({}),
            categories: vec!["Politics".into()],
            tags: vec!["Budget".into()],
        }
    }

    #[tokio::test]
    async fn term_ids_are_resolved_once_per_ttl() {
        let target = Arc::new(CountingTarget::default());
        let publisher = AutoPublisher::new(target.clone(), Duration::from_secs(60));

        assert_eq!(publisher.publish(&article()).await.unwrap(), PostId::new(99));
        publisher.publish(&article()).await.unwrap();

        assert_eq!(
            *target.lookups.lock().unwrap(),
            vec!["category:Politics", "tag:Budget"]
        );
        let posts = target.posts.lock().unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].category_refs, vec![TermId::new(10)]);
        assert_eq!(posts[0].status, PostStatus::Publish);
    }

    #[tokio::test]
    async fn invalidation_forces_a_fresh_lookup() {
        let target = Arc::new(CountingTarget::default());
        let publisher = AutoPublisher::new(target.clone(), Duration::from_secs(60));
        publisher.publish(&article()).await.unwrap();
        publisher.invalidate_cache();
        publisher.publish(&article()).await.unwrap();
        assert_eq!(target.lookups.lock().unwrap().len(), 4);
    }
}
