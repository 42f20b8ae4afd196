use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use cron::Schedule;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use reldigest_agents::{build_digest_workflow, prompts, GeminiAgent, ServiceRegistry};
use reldigest_core::config::AppConfig;
use reldigest_core::types::InvocationId;
use reldigest_workflow::{RunReport, WorkflowRunner};

#[derive(Parser)]
#[command(name = "reldigest", version, about = "Release-notes digest generator")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "reldigest.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the digest workflow once and print the report
    Run {
        /// Invocation id (defaults to one derived from today's date)
        #[arg(long)]
        invocation: Option<String>,
    },
    /// Run digests on the configured cron schedule until interrupted
    Daemon,
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    match cli.command.unwrap_or(Commands::Run { invocation: None }) {
        Commands::Run { invocation } => {
            let invocation = invocation.as_deref().map(InvocationId::from_string);
            let report = run_once(&config, invocation, cancel).await?;
            println!("{}", report.output);
        }
        Commands::Daemon => daemon(&config, cancel).await?,
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Build the workflow from config and run it once.
async fn run_once(
    config: &AppConfig,
    invocation: Option<InvocationId>,
    cancel: CancellationToken,
) -> anyhow::Result<RunReport> {
    let registry = ServiceRegistry::from_config(&config.services)?;

    let window = config.workflow.report_window_days;
    let fetch_agent = Arc::new(GeminiAgent::new(
        "ReleaseFetchAgent",
        prompts::fetch_agent_instructions(window),
        config.model.clone(),
    ));
    let summarize_agent = Arc::new(GeminiAgent::new(
        "SummarizeAgent",
        prompts::summarize_agent_instructions(window),
        config.model.clone(),
    ));

    let graph = Arc::new(build_digest_workflow(
        &registry,
        fetch_agent,
        summarize_agent,
        &config.workflow,
    )?);

    let runner = WorkflowRunner::new(graph)
        .with_step_timeout(Duration::from_secs(config.workflow.step_timeout_secs))
        .with_cancellation(cancel);

    Ok(runner.run(invocation).await?)
}

/// Fire digest runs on the configured cron schedule until interrupted.
async fn daemon(config: &AppConfig, cancel: CancellationToken) -> anyhow::Result<()> {
    let cron_config = config
        .cron
        .as_ref()
        .context("daemon mode requires a [cron] section in the config")?;
    let schedule = Schedule::from_str(&cron_config.schedule)
        .with_context(|| format!("invalid cron expression '{}'", cron_config.schedule))?;

    info!(schedule = %cron_config.schedule, "Digest daemon started");

    loop {
        let Some(fire_at) = schedule.upcoming(Utc).next() else {
            info!("No upcoming cron fire times, daemon exiting");
            break;
        };
        let delay = (fire_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::from_secs(1));

        info!(
            fire_at = %fire_at.format("%Y-%m-%d %H:%M:%S"),
            delay_secs = delay.as_secs(),
            "Next digest run scheduled"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                match run_once(config, None, cancel.clone()).await {
                    Ok(report) => {
                        info!(
                            invocation = %report.invocation_id,
                            elapsed_ms = report.total_elapsed_ms,
                            "Digest run completed"
                        );
                        println!("{}", report.output);
                    }
                    Err(e) => error!(error = %e, "Digest run failed"),
                }
            }
            _ = cancel.cancelled() => {
                info!("Digest daemon shutting down");
                break;
            }
        }
    }

    Ok(())
}
