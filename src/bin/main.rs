use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info};

use finance_ops::cli::{Cli, Commands, SchedulerCommands, SignalsCommands, SuggestionsCommands};
use finance_ops::config::Config;
use finance_ops::domain::UserId;
use finance_ops::engine::{
    AggregationEngine, AggregationOptions, PatternEngine, PatternEngineConfig, RiskEngine,
    RiskEngineConfig,
};
use finance_ops::llm::{LlmAdapter, LlmClient, LlmTransportError, RawLlmClient};
use finance_ops::storage::Repositories;
use finance_ops::{Scheduler, SchedulerSettings, SignalStatusUpdate, SignalStore};

/// An LLM transport with no provider wired up. Weekly-summary generation
/// falls back to the deterministic overview in this mode (see
/// `weekly::SummaryGenerator::generate`); every other command works without
/// an LLM at all.
struct UnconfiguredLlm;

#[async_trait::async_trait]
impl RawLlmClient for UnconfiguredLlm {
    async fn complete(&self, _prompt: &str) -> std::result::Result<String, LlmTransportError> {
        Err(LlmTransportError::Transport(
            "no LLM provider configured".to_string(),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        Config::default_sqlite()
    };

    info!("finance-ops v{}", finance_ops::VERSION);

    // A sqlx-backed store is deliberately not wired in here; see DESIGN.md.
    // Every command below runs against a fresh in-memory store.
    let repos = Repositories::in_memory();

    match &cli.command {
        Commands::Init => {
            let user_id = UserId::new();
            repos.preferences.get_or_create(user_id).await?;
            println!("Initialized in-memory store.");
            println!("New user id: {}", user_id);
        }
        Commands::Analyze { user } => {
            analyze(&repos, user).await?;
        }
        Commands::Scheduler { command } => {
            run_scheduler_command(&config, repos, command).await?;
        }
        Commands::Signals { command } => match command {
            SignalsCommands::List { user, output } => {
                list_signals(&repos, user, output).await?;
            }
        },
        Commands::Suggestions { command } => match command {
            SuggestionsCommands::List { user, output } => {
                list_suggestions(&repos, user, output).await?;
            }
        },
    }

    Ok(())
}

async fn analyze(repos: &Repositories, user: &str) -> Result<()> {
    let user_id = UserId::from_str(user)?;
    let reference = Utc::now();
    let week_start = finance_ops::dates::WeekStart::default();

    let aggregation = AggregationEngine::new(repos.transactions.clone())
        .run_aggregation(user_id, reference, &AggregationOptions::default())
        .await?;

    let pattern = PatternEngine::new(repos.transactions.clone(), PatternEngineConfig::default())
        .run_pattern_analysis(user_id, reference)
        .await?;

    let risk = RiskEngine::new(
        repos.transactions.clone(),
        repos.budgets.clone(),
        repos.goals.clone(),
        repos.subscriptions.clone(),
        RiskEngineConfig::default(),
    )
    .run_risk_analysis(user_id, reference, week_start)
    .await?;

    let signal_store = SignalStore::new(repos.signals.clone());
    let mut stored = 0usize;
    stored += signal_store.store_signals(&aggregation.signals).await?;
    stored += signal_store.store_signals(&pattern.signals).await?;
    stored += signal_store.store_signals(&risk.signals).await?;

    println!("Analysis for user {user_id}");
    println!("  aggregation windows: {}", aggregation.windows.len());
    println!("  spending categories tracked: {}", pattern.categories.len());
    println!("  risk items: {} (overall score {:.1})", risk.items.len(), risk.overall_score);
    println!("  new signals stored: {stored}");

    for item in &risk.items {
        println!("    risk: {:?} severity={:?} — {}", item.kind, item.severity, item.detail);
    }

    Ok(())
}

async fn run_scheduler_command(
    config: &Config,
    repos: Repositories,
    command: &SchedulerCommands,
) -> Result<()> {
    let llm: Arc<dyn LlmClient> = Arc::new(
        LlmAdapter::new(UnconfiguredLlm)
            .with_timeout(std::time::Duration::from_secs(config.llm.timeout_secs)),
    );
    let settings = SchedulerSettings {
        weekly_cron: config.scheduler.weekly_cron.clone(),
        timezone: config
            .scheduler
            .timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid scheduler timezone: {}", config.scheduler.timezone))?,
        batch_size: config.scheduler.batch_size,
        batch_delay_ms: config.scheduler.batch_delay_ms,
        week_start: config.scheduler.week_start,
    };
    let scheduler = Arc::new(Scheduler::new(repos, llm, settings)?);

    match command {
        SchedulerCommands::Run => {
            info!("starting scheduler loop, press Ctrl+C to stop");
            let handle = scheduler.clone().start();
            tokio::signal::ctrl_c().await?;
            scheduler.shutdown();
            let _ = handle.await;
        }
        SchedulerCommands::Retry { days_back } => {
            let summary = scheduler.retry_failed(*days_back).await?;
            println!(
                "Retry complete: attempted={} succeeded={} failed={}",
                summary.attempted, summary.succeeded, summary.failed
            );
            for err in &summary.errors {
                error!("{err}");
            }
        }
    }

    Ok(())
}

async fn list_signals(repos: &Repositories, user: &str, output: &str) -> Result<()> {
    let user_id = UserId::from_str(user)?;
    let store = SignalStore::new(repos.signals.clone());
    let signals = store
        .get_user_signals(user_id, &Default::default())
        .await?;

    match output {
        "json" => println!("{}", serde_json::to_string_pretty(&signals)?),
        _ => {
            println!("\n{:<36} {:<22} {:<8} {}", "ID", "Type", "Pri", "Name");
            println!("{}", "-".repeat(90));
            for signal in &signals {
                println!(
                    "{:<36} {:<22?} {:<8} {}",
                    signal.id.to_string(),
                    signal.signal_type,
                    signal.priority,
                    signal.name
                );
            }
            println!("\nTotal: {}", signals.len());
        }
    }

    // `update_signal_status` exists for API completeness; the CLI surface
    // only reads for now.
    let _ = SignalStatusUpdate::Active;

    Ok(())
}

async fn list_suggestions(repos: &Repositories, user: &str, output: &str) -> Result<()> {
    use finance_ops::domain::SuggestionStatus;

    let user_id = UserId::from_str(user)?;
    let suggestions = repos
        .suggestions
        .list_by_status(user_id, SuggestionStatus::Pending)
        .await?;

    match output {
        "json" => println!("{}", serde_json::to_string_pretty(&suggestions)?),
        _ => {
            println!("\n{:<36} {:<24} {:<10} {}", "ID", "Type", "Status", "Title");
            println!("{}", "-".repeat(100));
            for suggestion in &suggestions {
                println!(
                    "{:<36} {:<24?} {:<10?} {}",
                    suggestion.id.to_string(),
                    suggestion.suggestion_type,
                    suggestion.status,
                    suggestion.title
                );
            }
            println!("\nTotal pending: {}", suggestions.len());
        }
    }

    Ok(())
}
