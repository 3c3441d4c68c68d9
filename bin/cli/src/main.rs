use std::{process::ExitCode, sync::Arc};

use executor::{DeckRunner, Executor, LoggingReporter};
use kongctl_client::{HttpStateClient, entities::Plan};

#[macro_use]
extern crate tracing;

mod cli;

async fn app() -> anyhow::Result<ExecutionOutcome> {
  let config = config::run_config();
  logger::init(&config.logging)?;

  let args = config::cli_args();
  let plan_path = args.command.plan_file();
  let plan_bytes = tokio::fs::read(plan_path)
    .await
    .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", plan_path.display()))?;
  let mut plan: Plan = serde_json::from_slice(&plan_bytes)
    .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", plan_path.display()))?;

  let client = Arc::new(HttpStateClient::new(
    config.base_url.clone(),
    config.token.clone(),
  ));
  let executor = Executor::new(
    client,
    Arc::new(DeckRunner),
    Arc::new(LoggingReporter { debug: config.debug }),
    config.token.clone(),
    config.base_url.clone(),
  );

  let cancel = executor.cancel_handle();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupt received, finishing in-flight change and stopping");
      cancel.cancel();
    }
  });

  let result = executor.execute(&mut plan, args.command.dry_run()).await;
  let failed = result.failure_count > 0;
  cli::report(&result);

  Ok(ExecutionOutcome { failed })
}

struct ExecutionOutcome {
  failed: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
  dotenvy::dotenv().ok();

  match app().await {
    Ok(outcome) if outcome.failed => ExitCode::FAILURE,
    Ok(_) => ExitCode::SUCCESS,
    Err(e) => {
      error!("{e:#}");
      ExitCode::FAILURE
    }
  }
}
