//! The article submitted to a pipeline run.

use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// Minimum title length, in characters.
pub const MIN_TITLE_CHARS: usize = 5;

/// Minimum content length, in characters.
pub const MIN_CONTENT_CHARS: usize = 50;

/// A raw article as submitted by a caller.
///
/// Constructed only through [`ArticleInput::new`], which enforces the length
/// bounds; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleInput {
    title: String,
    content: String,
    author: Option<String>,
    auto_publish: bool,
}

impl ArticleInput {
    /// Validates and creates an article input.
    ///
    /// Lengths are counted in Unicode scalar values, not bytes.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidInput`] when the title is shorter than
    /// [`MIN_TITLE_CHARS`] or the content shorter than [`MIN_CONTENT_CHARS`].
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        author: Option<String>,
        auto_publish: bool,
    ) -> Result<Self, PipelineError> {
        let title = title.into();
        let content = content.into();

        if title.chars().count() < MIN_TITLE_CHARS {
            return Err(PipelineError::InvalidInput {
                field: "title".to_string(),
                reason: format!("must be at least {MIN_TITLE_CHARS} characters"),
            });
        }
        if content.chars().count() < MIN_CONTENT_CHARS {
            return Err(PipelineError::InvalidInput {
                field: "content".to_string(),
                reason: format!("must be at least {MIN_CONTENT_CHARS} characters"),
            });
        }

        Ok(Self {
            title,
            content,
            author: author.filter(|a| !a.trim().is_empty()),
            auto_publish,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Whether the caller asked for the article to be published when ready.
    pub fn auto_publish(&self) -> bool {
        self.auto_publish
    }

    /// Returns the first `max_chars` characters of title and content, for logs.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let joined = format!("{}\n\n{}", self.title, self.content);
        joined.chars().take(max_chars).collect()
    }
}

/// Wire form of an article submission, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleSubmission {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub auto_publish: bool,
}

impl TryFrom<ArticleSubmission> for ArticleInput {
    type Error = PipelineError;

    fn try_from(value: ArticleSubmission) -> Result<Self, Self::Error> {
        ArticleInput::new(value.title, value.content, value.author, value.auto_publish)
    }
}
