use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;
use timeline_copy::config::{CopierConfig, RawSettings, TimelinesConfig};
use timeline_copy::copier::{CopyOptions, CopyReport, Destination, KeyOutcome, TimelineCopier};
use timeline_copy::store::{RedisTimelineStore, TimelineStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
  name = "copy-timelines",
  about = "Copy FTT and notification timelines between Redis instances",
  version
)]
struct Args {
  #[arg(long, env = "SOURCE_HOST")]
  source_host: Option<String>,
  #[arg(long, env = "SOURCE_PORT")]
  source_port: Option<String>,
  #[arg(long, env = "KEY_PREFIX")]
  key_prefix: Option<String>,
  #[arg(long, env = "DEST_HOST")]
  dest_host: Option<String>,
  #[arg(long, env = "DEST_PORT")]
  dest_port: Option<String>,
  /// Timelines YAML file (default: ./timelines.yaml if present)
  #[arg(short, long)]
  config: Option<String>,
  /// List timeline to copy, replaces the configured list (repeatable)
  #[arg(long = "list")]
  list: Vec<String>,
  /// Skip notification timelines
  #[arg(long)]
  no_notifications: bool,
  /// Override dry run (`--dry-run false` writes to the destination)
  #[arg(long)]
  dry_run: Option<bool>,
  #[arg(long)]
  log_level: Option<String>,
  #[arg(long, default_value = "text")]
  format: OutputFormat,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
  #[default]
  Text,
  Json,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
  let args = Args::parse();

  // Load config: explicit path > auto-detect > defaults
  let mut file = if let Some(path) = &args.config {
    TimelinesConfig::from_file(path)?
  } else {
    TimelinesConfig::find_and_load()?.unwrap_or_default()
  };

  // CLI args override config file
  if !args.list.is_empty() {
    file.timelines.list = args.list.clone();
  }
  if args.no_notifications {
    file.timelines.notifications = false;
  }
  if let Some(dry_run) = args.dry_run {
    file.dry_run = dry_run;
  }
  if let Some(level) = &args.log_level {
    file.logging.level = level.clone();
  }

  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| file.logging.level.clone().into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let raw = RawSettings {
    source_host: args.source_host,
    source_port: args.source_port,
    key_prefix: args.key_prefix,
    dest_host: args.dest_host,
    dest_port: args.dest_port,
  };
  let config = match CopierConfig::resolve(raw, file) {
    Ok(config) => config,
    Err(e) => {
      eprintln!("{}", e);
      std::process::exit(1);
    }
  };

  let source: Arc<dyn TimelineStore> = Arc::new(
    RedisTimelineStore::connect(config.source.clone())
      .await
      .with_context(|| format!("connecting to source {}", config.source))?,
  );
  let destination = match &config.destination {
    Some(target) => Destination::Store(Arc::new(
      RedisTimelineStore::connect(target.clone())
        .await
        .with_context(|| format!("connecting to destination {}", target))?,
    )),
    None => Destination::None,
  };

  let copier = TimelineCopier::new(CopyOptions::from(&config), source, destination);
  let report = copier.run().await;
  copier.shutdown().await;

  match args.format {
    OutputFormat::Text => print_summary(&report),
    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
  }

  if report.has_failures() {
    std::process::exit(2);
  }
  Ok(())
}

fn print_summary(report: &CopyReport) {
  if report.dry_run {
    println!("{}", "Dry run, destination untouched".yellow());
  }

  for phase in report.phases() {
    println!(
      "{}: {} succeeded, {} skipped, {} failed",
      phase.phase.to_string().bold(),
      phase.succeeded().to_string().green(),
      phase.skipped().to_string().yellow(),
      phase.failed().to_string().red()
    );

    for key in &phase.keys {
      let status = match &key.outcome {
        KeyOutcome::Failed { .. } => key.outcome.to_string().red(),
        KeyOutcome::Skipped { .. } => key.outcome.to_string().yellow(),
        _ => key.outcome.to_string().green(),
      };
      println!("  {} {}", key.key, status);
    }
  }
}
