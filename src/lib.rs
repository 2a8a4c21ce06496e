pub mod config;
pub mod db;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod sources;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use config::{AppConfig, ConfigError};
use db::{DatabaseError, SqliteDigestStore};
use llm::{ChatCompletionClient, LlmClient};
use pipeline::{
    DigestPipeline, DigestSettings, MarkdownRenderer, MarkdownWriter, PaperSummarizer,
    PipelineError, PipelineRunResult, RankingProfile, RelevanceRanker,
};

#[derive(Parser, Debug)]
#[command(name = "paper-digest")]
#[command(about = "Generate the daily academic paper digest")]
#[command(version)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

/// Failures that abort a run before or during the pipeline.
#[derive(Error, Debug)]
enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

pub fn run() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    match execute(&cli) {
        Ok(result) => {
            println!("{}", outcome_line(&result));
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

fn execute(cli: &Cli) -> Result<PipelineRunResult, RunError> {
    let config = config::load_config(&cli.config)?
        .with_env_credentials(|name| std::env::var(name).ok());
    for line in config::runtime_log_lines(&config) {
        tracing::info!("{line}");
    }

    // Without any usable adapter there is nothing to digest; not a failure.
    let source = match sources::build_source(&config) {
        Ok(source) => source,
        Err(e) => return Ok(PipelineRunResult::skipped(e.to_string())),
    };

    let store = Arc::new(SqliteDigestStore::open(&config.runtime.db_path)?);
    let pipeline = build_pipeline(&config, source, store);
    Ok(pipeline.run(Utc::now())?)
}

/// Composition root: wires configured collaborators into a pipeline.
fn build_pipeline(
    config: &AppConfig,
    source: Box<dyn sources::PaperSource>,
    store: Arc<SqliteDigestStore>,
) -> DigestPipeline {
    let runtime = &config.runtime;
    let client: Arc<dyn LlmClient> = Arc::new(ChatCompletionClient::new(
        &config.llm.endpoint,
        config.llm.api_key.as_deref().unwrap_or_default(),
        config.llm.timeout_secs,
    ));
    if !client.enabled() {
        tracing::warn!("No LLM API key configured, using heuristic ranking and fallback summaries");
    }

    let profile = RankingProfile {
        research_field: config.query.research_field.clone(),
        include_keywords: config.query.include_keywords.clone(),
        exclude_keywords: config.query.exclude_keywords.clone(),
    };
    let ranker = RelevanceRanker::new(
        profile,
        Some(client.clone()),
        &runtime.model_name,
        &config.prompts.ranker_system,
    );
    let summarizer = PaperSummarizer::new(
        Some(client),
        &runtime.model_name,
        &config.prompts.summarizer_system,
        &config.query.research_field,
    );
    let writer = MarkdownWriter::new(
        &runtime.markdown_output_dir,
        &runtime.pdf_output_dir,
        runtime.output_pdf,
    );

    DigestPipeline::new(
        source,
        Box::new(ranker),
        Box::new(summarizer),
        store,
        Box::new(MarkdownRenderer),
        Box::new(writer),
        DigestSettings {
            top_k: runtime.top_k,
            min_interval_hours: runtime.min_interval_hours,
            window_days: runtime.window_days,
            model_used: runtime.model_name.clone(),
        },
    )
}

/// One-line human summary printed after every run.
pub fn outcome_line(result: &PipelineRunResult) -> String {
    match (&result.output_path, &result.skipped_reason) {
        (Some(path), _) if result.generated => {
            format!("Generated digest: {} papers -> {}", result.summary_count, path)
        }
        (_, Some(reason)) => format!("No digest generated: {reason}"),
        _ => "No digest generated: unknown reason".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_line_for_generated_digest() {
        let result = PipelineRunResult::generated("newspaper/markdown/0205_papers.md".into(), 3, vec![]);
        assert_eq!(
            outcome_line(&result),
            "Generated digest: 3 papers -> newspaper/markdown/0205_papers.md"
        );
    }

    #[test]
    fn outcome_line_for_skip() {
        let result = PipelineRunResult::skipped("Skipped by 48h gate");
        assert_eq!(outcome_line(&result), "No digest generated: Skipped by 48h gate");
    }

    #[test]
    fn cli_defaults_to_bundled_config() {
        let cli = Cli::parse_from(["paper-digest"]);
        assert_eq!(cli.config, PathBuf::from(config::DEFAULT_CONFIG_PATH));

        let cli = Cli::parse_from(["paper-digest", "--config", "other.json"]);
        assert_eq!(cli.config, PathBuf::from("other.json"));
    }

    #[test]
    fn missing_config_file_aborts() {
        let cli = Cli::parse_from(["paper-digest", "--config", "/nonexistent/config.json"]);
        let err = execute(&cli).unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::NotFound(_))));
    }

    #[test]
    fn no_usable_source_is_a_skip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let db = dir.path().join("cache.sqlite3");
        let text = format!(
            r#"{{"query": {{"research_field": "x"}},
                "runtime": {{"enabled_sources": ["scopus"], "db_path": {:?}}},
                "credentials": {{"scopus_api_key": ""}}}}"#,
            db.to_string_lossy()
        );
        std::fs::write(&path, text).unwrap();
        let cli = Cli { config: path };

        let result = execute(&cli).unwrap();

        assert!(!result.generated);
        assert_eq!(result.skipped_reason.as_deref(), Some("No paper sources configured"));
        assert!(!db.exists());
    }
}
