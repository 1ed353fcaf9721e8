//! `editorial`: runs articles through the editorial pipeline and maintains
//! the learned taxonomy profile.
//!
//! This binary is the composition root. It loads [`config::AppConfig`],
//! installs the tracing subscriber, builds the concrete adapters (OpenAI
//! compatible generator, file-backed profile store and run log, optional
//! WordPress target) and injects them into [`nodes::PipelineExecutor`].

mod config;
mod telemetry;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use llm::OpenAiGenerator;
use nodes::{Autolearner, PipelineDeps, PipelineExecutor};
use pipeline::{
    ArticleInput, ArticleSubmission, PublishingTarget, RunId, SystemClock, TextGenerator,
};
use publisher::WordPressTarget;
use serde::Serialize;
use storage::{JsonFileProfileStore, JsonlRunLog};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};

#[derive(Parser, Debug)]
#[command(name = "editorial")]
#[command(about = "Editorial content pipeline: clean, audit, optimize and plan news articles")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, env = "EDITORIAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one article through the pipeline and print the outcome as JSON
    Run(ArticleArgs),
    /// Same as `run`, but never publishes
    Simulate(ArticleArgs),
    /// Inspect and maintain the learned taxonomy profile
    Taxonomy {
        #[command(subcommand)]
        action: TaxonomyAction,
    },
}

#[derive(Subcommand, Debug)]
enum TaxonomyAction {
    /// Print profile statistics
    Summary,
    /// Find categories with similar traffic per use
    DiscoverSynonyms,
    /// Fold near-identical categories into one another
    Merge,
    /// Recommend tags for a category
    Recommend {
        #[arg(long)]
        category: String,
    },
}

#[derive(Args, Debug)]
struct ArticleArgs {
    /// JSON submission with `title`, `content`, optional `author` and `auto_publish`
    #[arg(short, long, conflicts_with_all = ["title", "content", "content_file"])]
    input: Option<PathBuf>,

    #[arg(long, requires = "body")]
    title: Option<String>,

    #[arg(long, group = "body")]
    content: Option<String>,

    /// Read the article body from a plain-text file
    #[arg(long, group = "body")]
    content_file: Option<PathBuf>,

    #[arg(long)]
    author: Option<String>,

    /// Publish the article when it is ready and publishing is enabled
    #[arg(long)]
    auto_publish: bool,

    /// Use this run id instead of a random one
    #[arg(long)]
    run_id: Option<Uuid>,
}

impl ArticleArgs {
    fn submission(&self) -> Result<ArticleSubmission> {
        if let Some(path) = &self.input {
            let raw = read(path)?;
            let mut submission: ArticleSubmission = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a valid submission", path.display()))?;
            submission.auto_publish |= self.auto_publish;
            if self.author.is_some() {
                submission.author = self.author.clone();
            }
            return Ok(submission);
        }

        let title = self
            .title
            .clone()
            .context("either --input or --title with --content/--content-file is required")?;
        let content = match (&self.content, &self.content_file) {
            (Some(content), _) => content.clone(),
            (None, Some(path)) => read(path)?,
            (None, None) => anyhow::bail!("--title needs --content or --content-file"),
        };
        Ok(ArticleSubmission {
            title,
            content,
            author: self.author.clone(),
            auto_publish: self.auto_publish,
        })
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn autolearner(config: &AppConfig) -> Arc<Autolearner> {
    Arc::new(Autolearner::new(
        Arc::new(JsonFileProfileStore::new(&config.storage.profile_path)),
        config.autolearn.clone(),
    ))
}

fn executor(config: &AppConfig, allow_publish: bool) -> Result<PipelineExecutor> {
    let generator = OpenAiGenerator::new(config.llm.clone()).context("invalid [llm] settings")?;
    let publisher = match config.usable_publisher() {
        Some(wp) if allow_publish => {
            info!(base_url = %wp.base_url, "publishing target configured");
            Some(Arc::new(WordPressTarget::new(wp.clone())) as Arc<dyn PublishingTarget>)
        }
        _ => None,
    };

    let mut settings = config.pipeline.clone();
    settings.auto_publish_enabled &= allow_publish;

    let deps = PipelineDeps {
        generator: Arc::new(generator) as Arc<dyn TextGenerator>,
        autolearner: autolearner(config),
        run_log: Arc::new(JsonlRunLog::new(&config.storage.run_log_path)),
        clock: Arc::new(SystemClock),
        publisher,
    };
    Ok(PipelineExecutor::new(deps, settings))
}

async fn run_article(
    config: &AppConfig,
    args: &ArticleArgs,
    allow_publish: bool,
) -> Result<ExitCode> {
    let mut submission = args.submission()?;
    submission.auto_publish &= allow_publish;
    let input = ArticleInput::try_from(submission).context("article rejected")?;
    let executor = executor(config, allow_publish)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            on_interrupt.cancel();
        }
    });

    let outcome = executor
        .run(&input, args.run_id.map(RunId::from_uuid), &cancel)
        .await;
    interrupt.abort();

    print_json(&outcome)?;
    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn taxonomy(config: &AppConfig, action: &TaxonomyAction) -> Result<ExitCode> {
    let learner = autolearner(config);
    match action {
        TaxonomyAction::Summary => print_json(&learner.summary().await?)?,
        TaxonomyAction::DiscoverSynonyms => print_json(&learner.discover_synonyms().await?)?,
        TaxonomyAction::Merge => print_json(&learner.merge_similar_categories().await?)?,
        TaxonomyAction::Recommend { category } => {
            print_json(&learner.recommend_tags(category).await?)?
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let telemetry = telemetry::init()?;

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = AppConfig::load(&config_path, cli.config.is_some())?;

    let result = match &cli.command {
        Command::Run(args) => run_article(&config, args, true).await,
        Command::Simulate(args) => run_article(&config, args, false).await,
        Command::Taxonomy { action } => taxonomy(&config, action).await,
    };

    telemetry.shutdown();
    result
}
