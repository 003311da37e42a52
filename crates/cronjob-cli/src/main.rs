use std::io::Read;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use cronjob_codec::{decode, validate_schedule, CronJobDraft, JobSpec, Schedule, ValidationOptions};
use cronjob_core::CronjobConfig;
use tracing::{debug, info};

/// Translate scheduled-job specs to and from pg_cron command text.
#[derive(Debug, Parser)]
#[command(name = "cronjob", version)]
struct Cli {
    /// Config file (default: ~/.cronjob/cronjob.toml, or $CRONJOB_CONFIG).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a JobSpec (JSON) and print its registration statement.
    Encode {
        #[arg(long)]
        name: String,
        /// Defaults to `scheduler.default_schedule`.
        #[arg(long)]
        schedule: Option<String>,
        /// Read the spec from this file instead of stdin.
        #[arg(long)]
        file: Option<String>,
    },
    /// Decode stored command text and print the JobSpec as JSON.
    Decode {
        /// Command text; read from stdin when omitted.
        #[arg(long)]
        command: Option<String>,
    },
    /// Check a schedule against the configured job store.
    Validate {
        #[arg(long)]
        schedule: String,
    },
    /// Describe a schedule and list its next runs.
    Describe {
        schedule: String,
        #[arg(long, default_value_t = 5)]
        next: usize,
    },
}

fn main() -> anyhow::Result<()> {
    // stdout carries results, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cronjob=info,cronjob_codec=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // load config: --config > CRONJOB_CONFIG env > ~/.cronjob/cronjob.toml
    let config_path = cli.config.clone().or_else(|| std::env::var("CRONJOB_CONFIG").ok());
    let config = CronjobConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        CronjobConfig::default()
    });
    debug!(?config, "effective configuration");

    match cli.command {
        Command::Encode {
            name,
            schedule,
            file,
        } => {
            let ctx = config.deployment_context()?;
            let options = ValidationOptions {
                supports_seconds: config.supports_seconds()?,
            };
            let input = read_input(file.as_deref())?;
            let mut value: serde_json::Value =
                serde_json::from_str(&input).context("parsing JobSpec JSON")?;
            // HTTP specs without a timeout take the configured default
            if let Some(obj) = value.as_object_mut() {
                let is_http = matches!(
                    obj.get("type").and_then(|t| t.as_str()),
                    Some("http_request" | "edge_function")
                );
                if is_http && !obj.contains_key("timeout_ms") {
                    obj.insert(
                        "timeout_ms".into(),
                        config.scheduler.default_timeout_ms.into(),
                    );
                }
            }
            let spec: JobSpec = serde_json::from_value(value).context("parsing JobSpec JSON")?;
            let schedule = schedule.unwrap_or_else(|| config.scheduler.default_schedule.clone());
            let draft = CronJobDraft::new(name, schedule, spec);

            if let Err(errors) = draft.validate(&ctx, options) {
                for e in errors.iter() {
                    eprintln!("{e}");
                }
                bail!("{} field(s) failed validation", errors.len());
            }
            let statement = draft.to_statement(&ctx, options)?;
            info!(name = %draft.name, kind = %draft.spec.kind(), "statement built");
            println!("{statement}");
        }
        Command::Decode { command } => {
            let ctx = config.deployment_context()?;
            let text = match command {
                Some(text) => text,
                None => read_input(None)?,
            };
            let spec = decode(&text, &ctx);
            println!("{}", serde_json::to_string_pretty(&spec)?);
        }
        Command::Validate { schedule } => {
            match validate_schedule(&schedule, config.supports_seconds()?) {
                Ok(parsed) => println!("ok: {}", parsed.describe()?),
                Err(e) => bail!("{e}"),
            }
        }
        Command::Describe { schedule, next } => {
            let parsed: Schedule = schedule.parse()?;
            println!("{}", parsed.describe()?);
            for at in parsed.upcoming(chrono::Utc::now(), next) {
                println!("  {}", at.to_rfc3339());
            }
        }
    }
    Ok(())
}

/// Read all of `path`, or stdin when no path is given.
fn read_input(path: Option<&str>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {path}")),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}
