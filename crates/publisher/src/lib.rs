//! WordPress REST adapter for [`pipeline::PublishingTarget`].
//!
//! Talks to `{base_url}/wp-json/wp/v2` with HTTP basic authentication
//! (an application password).

use async_trait::async_trait;
use pipeline::{PostDraft, PostId, PublishError, PublishingTarget, TermId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

const API_PATH: &str = "wp-json/wp/v2";
/// Results requested per term search.
const SEARCH_PAGE_SIZE: u32 = 100;

/// Connection settings for a WordPress site.
#[derive(Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WordPressConfig {
    /// Site root, e.g. `https://news.example.com`.
    pub base_url: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl std::fmt::Debug for WordPressConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordPressConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl WordPressConfig {
    /// Whether enough is set to attempt a connection.
    pub fn is_complete(&self) -> bool {
        !self.base_url.trim().is_empty() && !self.username.is_empty() && !self.password.is_empty()
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/{API_PATH}/{resource}", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct Term {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: Option<u64>,
}

/// Which WordPress taxonomy a term lives in.
#[derive(Debug, Clone, Copy)]
enum Taxonomy {
    Categories,
    Tags,
}

impl Taxonomy {
    fn resource(self) -> &'static str {
        match self {
            Taxonomy::Categories => "categories",
            Taxonomy::Tags => "tags",
        }
    }
}

/// A [`PublishingTarget`] backed by the WordPress REST API.
#[derive(Debug, Clone)]
pub struct WordPressTarget {
    http: reqwest::Client,
    config: WordPressConfig,
}

impl WordPressTarget {
    pub fn new(config: WordPressConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn ensure_term(&self, taxonomy: Taxonomy, name: &str) -> Result<TermId, PublishError> {
        let url = self.config.endpoint(taxonomy.resource());
        let per_page = SEARCH_PAGE_SIZE.to_string();

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .query(&[("search", name), ("per_page", per_page.as_str())])
            .send()
            .await
            .map_err(transport)?;
        let terms: Vec<Term> = check(response).await?.json().await.map_err(transport)?;
        if let Some(id) = find_term(&terms, name) {
            debug!(taxonomy = taxonomy.resource(), name, id = id.as_u64(), "term found");
            return Ok(id);
        }

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&json!({ "name": name }))
            .send()
            .await
            .map_err(transport)?;
        let created: Created = check(response).await?.json().await.map_err(transport)?;
        let id = created.id.map(TermId::new).ok_or_else(|| PublishError::MissingIdentifier {
            what: format!("{} '{name}'", taxonomy.resource()),
        })?;
        info!(taxonomy = taxonomy.resource(), name, id = id.as_u64(), "term created");
        Ok(id)
    }
}

#[async_trait]
impl PublishingTarget for WordPressTarget {
    async fn ensure_category(&self, name: &str) -> Result<TermId, PublishError> {
        self.ensure_term(Taxonomy::Categories, name).await
    }

    async fn ensure_tag(&self, name: &str) -> Result<TermId, PublishError> {
        self.ensure_term(Taxonomy::Tags, name).await
    }

    async fn create_post(&self, draft: &PostDraft) -> Result<PostId, PublishError> {
        let response = self
            .http
            .post(self.config.endpoint("posts"))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&post_body(draft))
            .send()
            .await
            .map_err(transport)?;
        let created: Created = check(response).await?.json().await.map_err(transport)?;
        let id = created.id.map(PostId::new).ok_or_else(|| PublishError::MissingIdentifier {
            what: "post".to_string(),
        })?;
        info!(post_id = id.as_u64(), title = %draft.title, "post created");
        Ok(id)
    }
}

fn post_body(draft: &PostDraft) -> serde_json::Value {
    let mut body = json!({
        "title": draft.title,
        "content": draft.content,
        "status": draft.status,
    });
    if !draft.category_refs.is_empty() {
        body["categories"] = json!(draft.category_refs.iter().map(|t| t.as_u64()).collect::<Vec<_>>());
    }
    if !draft.tag_refs.is_empty() {
        body["tags"] = json!(draft.tag_refs.iter().map(|t| t.as_u64()).collect::<Vec<_>>());
    }
    body
}

fn find_term(terms: &[Term], name: &str) -> Option<TermId> {
    let wanted = name.trim().to_lowercase();
    terms
        .iter()
        .find(|t| t.name.trim().to_lowercase() == wanted)
        .map(|t| TermId::new(t.id))
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, PublishError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(PublishError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn transport(err: reqwest::Error) -> PublishError {
    PublishError::Transport {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::PostStatus;

    #[test]
    fn endpoint_joins_site_root() {
        let config = WordPressConfig {
            base_url: "https://news.example.com/".into(),
            ..WordPressConfig::default()
        };
        assert_eq!(
            config.endpoint("posts"),
            "https://news.example.com/wp-json/wp/v2/posts"
        );
    }

    #[test]
    fn incomplete_config_is_detected() {
        let mut config = WordPressConfig {
            base_url: "https://news.example.com".into(),
            username: "editor".into(),
            password: String::new(),
        };
        assert!(!config.is_complete());
        config.password = "app-password".into();
        assert!(config.is_complete());
        assert!(!format!("{config:?}").contains("app-password"));
    }

    #[test]
    fn term_match_ignores_case_and_partial_hits() {
        let terms = vec![
            Term { id: 3, name: "Salud Publica".into() },
            Term { id: 7, name: "Salud".into() },
        ];
        assert_eq!(find_term(&terms, "SALUD"), Some(TermId::new(7)));
        assert_eq!(find_term(&terms, "Cultura"), None);
    }

    #[test]
    fn post_body_omits_empty_term_lists() {
        let draft = PostDraft {
            title: "Budget vote".into(),
            content: "<p>Body</p>".into(),
            category_refs: vec![TermId::new(7)],
            tag_refs: Vec::new(),
            status: PostStatus::Publish,
        };
        let body = post_body(&draft);
        assert_eq!(body["status"], "publish");
        assert_eq!(body["categories"], json!([7]));
        assert!(body.get("tags").is_none());
    }
}
