use std::{path::PathBuf, sync::OnceLock};

use clap::{Parser, Subcommand};
use logger::LogConfig;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "kongctl", version, about = "Declarative execution engine for the Kong platform")]
pub struct CliArgs {
  #[command(subcommand)]
  pub command: Command,

  /// Overrides KONGCTL_TOKEN.
  #[arg(long, global = true)]
  pub token: Option<String>,

  /// Overrides KONGCTL_BASE_URL.
  #[arg(long, global = true)]
  pub base_url: Option<String>,

  #[arg(long, global = true)]
  pub log_level: Option<logger::LogLevel>,

  /// Emit newline-delimited JSON logs instead of the human-readable format.
  #[arg(long, global = true)]
  pub json_logs: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// Execute a plan produced in "apply" mode: create and update only.
  Apply {
    plan_file: PathBuf,
    #[arg(long)]
    dry_run: bool,
  },
  /// Execute a plan produced in "sync" mode: create, update and delete.
  Sync {
    plan_file: PathBuf,
    #[arg(long)]
    dry_run: bool,
  },
}

impl Command {
  pub fn plan_file(&self) -> &PathBuf {
    match self {
      Command::Apply { plan_file, .. } => plan_file,
      Command::Sync { plan_file, .. } => plan_file,
    }
  }

  pub fn dry_run(&self) -> bool {
    match self {
      Command::Apply { dry_run, .. } => *dry_run,
      Command::Sync { dry_run, .. } => *dry_run,
    }
  }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Env {
  pub kongctl_token: Option<String>,
  pub kongctl_base_url: Option<String>,
  pub kongctl_log_level: Option<logger::LogLevel>,
  #[serde(default)]
  pub kongctl_json_logs: bool,
  /// Enables verbose field-by-field logging at the executor boundary.
  #[serde(default)]
  pub kongctl_debug: bool,
}

/// The fully resolved configuration the binary runs with: CLI flags win
/// over environment variables.
#[derive(Debug, Clone)]
pub struct RunConfig {
  pub token: String,
  pub base_url: String,
  pub logging: LogConfig,
  pub debug: bool,
}

pub fn cli_args() -> &'static CliArgs {
  static ARGS: OnceLock<CliArgs> = OnceLock::new();
  ARGS.get_or_init(CliArgs::parse)
}

pub fn run_config() -> &'static RunConfig {
  static CONFIG: OnceLock<RunConfig> = OnceLock::new();
  CONFIG.get_or_init(|| {
    let env: Env =
      envy::from_env().expect("failed to parse kongctl environment");
    let args = cli_args();

    RunConfig {
      token: args
        .token
        .clone()
        .or(env.kongctl_token)
        .expect("KONGCTL_TOKEN or --token must be set"),
      base_url: args
        .base_url
        .clone()
        .or(env.kongctl_base_url)
        .expect("KONGCTL_BASE_URL or --base-url must be set"),
      logging: LogConfig {
        level: args
          .log_level
          .or(env.kongctl_log_level)
          .unwrap_or_default(),
        json: args.json_logs || env.kongctl_json_logs,
        ansi: !(args.json_logs || env.kongctl_json_logs),
      },
      debug: env.kongctl_debug,
    }
  })
}
