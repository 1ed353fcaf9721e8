use std::sync::Mutex;

use async_trait::async_trait;
use pipeline::humanize::humanize_locally;
use pipeline::results::HumanizedText;
use pipeline::settings::char_prefix;
use pipeline::{GenerationRequest, PipelineError, StageName};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::gateway::LlmGateway;
use crate::prompts;
use crate::stage::{Stage, Staged};

/// Stage 6: local smoothing rules, then a model rewrite.
///
/// Only the first `budget` characters go to the model; the rest of the
/// locally-rewritten text is appended after the model's answer. When the
/// model fails or answers with nothing, the local rewrite is the result.
pub struct HumanizerStage {
    gateway: LlmGateway,
    budget: usize,
    rng: Mutex<StdRng>,
}

impl HumanizerStage {
    /// `seed` pins the word-variation choices; `None` seeds from entropy.
    pub fn new(gateway: LlmGateway, budget: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            gateway,
            budget,
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait]
impl Stage for HumanizerStage {
    type Input = String;
    type Output = HumanizedText;

    fn name(&self) -> StageName {
        StageName::Humanizer
    }

    async fn run(&self, text: &String) -> Result<Staged<HumanizedText>, PipelineError> {
        let local = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            humanize_locally(text, &mut *rng)
        };
        debug!(changes = ?local.changes, "local rewrite applied");

        let head = char_prefix(&local.text, self.budget);
        let tail = &local.text[head.len()..];
        let request =
            GenerationRequest::new(prompts::humanize(head)).with_system(prompts::HUMANIZE_SYSTEM);

        let staged = match self.gateway.text("humanize", request).await {
            Ok(rewritten) if !rewritten.trim().is_empty() => {
                let mut text = rewritten.trim().to_string();
                if !tail.trim().is_empty() {
                    text.push(' ');
                    text.push_str(tail.trim_start());
                }
                Staged::completed(HumanizedText {
                    text,
                    local_changes: local.changes,
                    rewritten: true,
                })
            }
            Ok(_) => Staged::degraded(
                HumanizedText {
                    text: local.text,
                    local_changes: local.changes,
                    rewritten: false,
                },
                "model returned an empty rewrite",
            ),
            Err(err) => Staged::degraded(
                HumanizedText {
                    text: local.text,
                    local_changes: local.changes,
                    rewritten: false,
                },
                err.to_string(),
            ),
        };
        info!(
            rewritten = staged.output.rewritten,
            chars = staged.output.text.chars().count(),
            "humanized"
        );
        Ok(staged)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pipeline::{GenerationError, ModelName, StageStatus, TextGenerator};

    use super::*;

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            Ok(format!("REWRITTEN[{}]", request.prompt.len()))
        }

        fn model_name(&self) -> ModelName {
            ModelName::new("echo").unwrap()
        }
    }

    struct Down;

    #[async_trait]
    impl TextGenerator for Down {
        async fn generate(&self, _: &GenerationRequest) -> Result<String, GenerationError> {
            Err(GenerationError::Api {
                status: 401,
                message: "bad key".into(),
            })
        }

        fn model_name(&self) -> ModelName {
            ModelName::new("down").unwrap()
        }
    }

    #[tokio::test]
    async fn model_failure_keeps_local_rewrite() {
        let stage = HumanizerStage::new(LlmGateway::new(Arc::new(Down)), 1500, Some(7));
        let staged = stage
            .run(&"The plan is not final and the mayor cannot comment.".to_string())
            .await
            .unwrap();
        assert_eq!(staged.status(), StageStatus::Degraded);
        assert_eq!(
            staged.output.text,
            "The plan isn't final and the mayor can't comment."
        );
        assert_eq!(staged.output.local_changes, vec!["applied contractions"]);
        assert!(!staged.output.rewritten);
    }

    #[tokio::test]
    async fn text_beyond_budget_is_appended_after_rewrite() {
        let stage = HumanizerStage::new(LlmGateway::new(Arc::new(Echo)), 10, Some(7));
        let staged = stage
            .run(&"0123456789 tail sentence.".to_string())
            .await
            .unwrap();
        assert!(staged.output.rewritten);
        assert!(staged.output.text.starts_with("REWRITTEN["));
        assert!(staged.output.text.ends_with(" tail sentence."));
    }
}
