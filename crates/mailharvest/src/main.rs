//! CLI entry point for `mailharvest`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, ArgGroup, Parser};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use mailharvest::config::{default_config_path, load_config, load_optional_config, Config};
use mailharvest::harvest::{HarvestReport, Harvester, ProgressEvent, ProgressReporter};
use mailharvest::{CredentialProvider, GmailClient, SelectionCriterion};

/// Download every attachment from the matching messages of a Gmail mailbox.
#[derive(Parser)]
#[command(name = "mailharvest", version, about)]
#[command(group(ArgGroup::new("criterion").required(true).args(["label", "from", "all"])))]
struct Cli {
    /// Harvest messages carrying this label
    #[arg(long, value_name = "NAME")]
    label: Option<String>,

    /// Harvest messages from this sender (first page of results only)
    #[arg(long, value_name = "ADDRESS")]
    from: Option<String>,

    /// Harvest every message in the mailbox
    #[arg(long)]
    all: bool,

    /// Config file (defaults to the platform config dir)
    #[arg(short, long, value_name = "PATH", env = "MAILHARVEST_CONFIG")]
    config: Option<PathBuf>,

    /// Directory attachments are written into
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn criterion(&self) -> SelectionCriterion {
        if let Some(label) = &self.label {
            SelectionCriterion::ByLabel(label.clone())
        } else if let Some(address) = &self.from {
            SelectionCriterion::BySender(address.clone())
        } else {
            SelectionCriterion::All
        }
    }
}

/// Spinner on stdout mirroring pipeline progress.
struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    fn new() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
        let style = ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

impl ProgressReporter for SpinnerProgress {
    fn report(&self, event: ProgressEvent) {
        let message = match event {
            ProgressEvent::PageRead { page } => format!("Reading page: {}", page),
            ProgressEvent::PagesDone { messages } => {
                format!("All pages are read ({} messages)", messages)
            }
            ProgressEvent::MessagesFetched { done, total } => {
                format!("Fetched {}/{} emails", done, total)
            }
            ProgressEvent::Waiting { delay } => {
                format!("Waited {:.1}s before next batch", delay.as_secs_f64())
            }
            ProgressEvent::AttachmentsFound { count } => format!("Found {} attachments", count),
            ProgressEvent::AttachmentsSaved { done, total } => {
                format!("Saved {}/{} attachments", done, total)
            }
        };
        self.bar.set_message(message);
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => match default_config_path() {
            Some(path) => load_optional_config(path)?,
            None => Config::default(),
        },
    };
    if let Some(output) = &cli.output {
        config.output_directory = output.clone();
    }
    Ok(config)
}

fn setup_logging(level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

async fn harvest(
    config: Config,
    criterion: &SelectionCriterion,
    progress: Arc<SpinnerProgress>,
) -> mailharvest::Result<HarvestReport> {
    let token = CredentialProvider::new(config.auth.clone())?
        .access_token()
        .await?;
    let client = GmailClient::new(&config.provider, token)?;
    Harvester::new(client, config, progress).run(criterion).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    let log_level = match cli.verbose {
        0 => config.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level);

    let criterion = cli.criterion();
    let output_directory = config.output_directory.clone();
    let progress = Arc::new(SpinnerProgress::new());
    progress.bar.set_message("Initializing...");

    match harvest(config, &criterion, progress.clone()).await {
        Ok(report) => {
            progress.bar.finish_with_message(format!(
                "Saved {} attachments to {}",
                report.attachments_saved,
                output_directory.display()
            ));
            if report.save_failures > 0 || report.fetch_failures > 0 {
                println!(
                    "{} attachments failed, {} messages could not be fetched",
                    report.save_failures, report.fetch_failures
                );
            }
            Ok(())
        }
        Err(e) => {
            progress.bar.abandon_with_message("An error occurred");
            Err(e.into())
        }
    }
}
