//! Caseflow CLI - support-case lifecycle engine.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use caseflow::classify::{classify, Classification};
use caseflow::config::EngineConfig;
use caseflow::monitor::{SweepConfig, Sweeper};
use caseflow::notify::{template, NotificationDispatcher, SmtpMailer};
use caseflow::portal::{BrowserPortal, Portal};
use caseflow::store::{CaseRepository, PgCaseStore};
use caseflow::NewCase;

/// Caseflow CLI - Track support cases on a browser-only manufacturer portal.
#[derive(Parser)]
#[command(name = "caseflow")]
#[command(about = "Support-case submission, monitoring and notification")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the sweep loop until interrupted (for service use)
    Run,

    /// Run a single sweep pass over all open cases (for CronJob use)
    Sweep,

    /// Submit a new support case through the portal
    Submit {
        /// Owner's user id in the store
        #[arg(long)]
        user_id: String,

        /// Issue description
        #[arg(long)]
        text: String,
    },

    /// Look up and classify the current status of a case
    Status {
        /// Portal-assigned task number (SUP-...)
        task_number: String,
    },

    /// Send a test email to verify SMTP configuration
    EmailTest,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("caseflow=debug,info")
    } else {
        EnvFilter::new("caseflow=info,warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Run => run_service().await,
        Commands::Sweep => run_sweep_once().await,
        Commands::Submit { user_id, text } => run_submit(&user_id, &text).await,
        Commands::Status { task_number } => run_status(&task_number).await,
        Commands::EmailTest => run_email_test().await,
    }
}

fn build_sweeper(config: &EngineConfig, store: Arc<PgCaseStore>) -> Result<Sweeper> {
    let portal = Arc::new(BrowserPortal::new(
        config.portal_base_url.clone(),
        config.headless,
    ));
    let mailer = Arc::new(SmtpMailer::from_env()?);
    Ok(Sweeper::new(
        portal,
        store,
        NotificationDispatcher::new(mailer),
        SweepConfig {
            interval: config.sweep_interval,
            reminder_after: config.reminder_after,
        },
    ))
}

async fn connect_store(config: &EngineConfig) -> Result<Arc<PgCaseStore>> {
    let store = PgCaseStore::connect(&config.database_url).await?;
    store.ensure_schema().await?;
    Ok(Arc::new(store))
}

async fn run_service() -> Result<()> {
    let config = EngineConfig::from_env()?;
    let store = connect_store(&config).await?;
    let sweeper = build_sweeper(&config, store)?;

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
                shutdown.cancel();
            }
        });
    }

    tracing::info!(
        interval_secs = config.sweep_interval.as_secs(),
        "starting sweep loop"
    );
    sweeper.run(shutdown).await;
    Ok(())
}

async fn run_sweep_once() -> Result<()> {
    let config = EngineConfig::from_env()?;
    let store = connect_store(&config).await?;
    let sweeper = build_sweeper(&config, store)?;

    let stats = sweeper.sweep_once().await;

    println!("\n📊 Sweep Summary");
    println!("   Checked: {}", stats.checked);
    println!("   Resolved: {}", stats.resolved);
    println!("   Reminders: {}", stats.reminders);

    if !stats.errors.is_empty() {
        println!("   Errors: {}", stats.errors.len());
        for err in &stats.errors {
            eprintln!("     - {err}");
        }
    }
    Ok(())
}

async fn run_submit(user_id: &str, text: &str) -> Result<()> {
    let config = EngineConfig::from_env()?;
    let store = connect_store(&config).await?;
    let portal = BrowserPortal::new(config.portal_base_url.clone(), config.headless);

    let task_number = match portal.submit(user_id, text).await {
        Ok(task_number) => task_number,
        Err(e) => {
            eprintln!("{}", template::submission_failed_message());
            return Err(e.into());
        }
    };

    store
        .create(NewCase {
            task_number: task_number.clone(),
            user_id: user_id.to_string(),
            original_text: text.to_string(),
            translated_text: text.to_string(),
        })
        .await?;

    println!("✅ Case submitted");
    println!("   Tracking number: {task_number}");
    Ok(())
}

async fn run_status(task_number: &str) -> Result<()> {
    let config = EngineConfig::from_env()?;
    let portal = BrowserPortal::new(config.portal_base_url.clone(), config.headless);

    let page = portal.status_page(task_number).await?;
    match classify(&page) {
        Classification::Open => println!("🟡 {task_number}: open"),
        Classification::Resolved { response_text } => {
            println!("✅ {task_number}: resolved");
            if let Some(text) = response_text {
                println!("   {}", caseflow::format_resolution_response(&text));
            }
        }
        Classification::Unknown => {
            println!("{}", template::status_unknown_message(task_number));
        }
    }
    Ok(())
}

async fn run_email_test() -> Result<()> {
    let mailer = SmtpMailer::from_env()?;
    mailer.send_test().await?;
    println!("✅ Test email sent");
    Ok(())
}
