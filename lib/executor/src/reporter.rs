use kongctl_client::entities::{Plan, PlannedChange};

use crate::{error::ExecutorError, result::ExecutionResult};

/// Observer receiving progress callbacks during execution. The default
/// `LoggingReporter` is enough for the CLI; tests and richer frontends
/// (TUI progress bars) supply their own.
pub trait Reporter: Send + Sync {
  fn start_execution(&self, _plan: &Plan) {}
  fn start_change(&self, _change: &PlannedChange) {}
  fn complete_change(
    &self,
    _change: &PlannedChange,
    _err: Option<&ExecutorError>,
  ) {
  }
  fn skip_change(&self, _change: &PlannedChange, _reason: &str) {}
  fn finish_execution(&self, _result: &ExecutionResult) {}
}

/// Logs every callback through `tracing`, at the verbosity the shared
/// logger crate is configured for.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingReporter {
  /// Enables verbose field-by-field logging at the executor boundary.
  pub debug: bool,
}

impl Reporter for LoggingReporter {
  fn start_execution(&self, plan: &Plan) {
    tracing::info!(
      changes = plan.changes.len(),
      mode = ?plan.metadata.mode,
      "starting execution"
    );
  }

  fn start_change(&self, change: &PlannedChange) {
    if self.debug {
      tracing::debug!(
        change_id = %change.id,
        resource_type = %change.resource_type,
        resource_ref = %change.resource_ref,
        action = %change.action,
        fields = ?change.fields,
        "starting change"
      );
    } else {
      tracing::info!(
        change_id = %change.id,
        resource_type = %change.resource_type,
        resource_ref = %change.resource_ref,
        action = %change.action,
        "starting change"
      );
    }
  }

  fn complete_change(
    &self,
    change: &PlannedChange,
    err: Option<&ExecutorError>,
  ) {
    match err {
      Some(err) => tracing::error!(
        change_id = %change.id,
        resource_type = %change.resource_type,
        resource_ref = %change.resource_ref,
        error = %err,
        "change failed"
      ),
      None => tracing::info!(
        change_id = %change.id,
        resource_type = %change.resource_type,
        resource_ref = %change.resource_ref,
        "change complete"
      ),
    }
  }

  fn skip_change(&self, change: &PlannedChange, reason: &str) {
    tracing::info!(
      change_id = %change.id,
      resource_type = %change.resource_type,
      reason,
      "change skipped"
    );
  }

  fn finish_execution(&self, result: &ExecutionResult) {
    tracing::info!(
      success = result.success_count,
      failure = result.failure_count,
      skipped = result.skipped_count,
      dry_run = result.dry_run,
      "execution finished"
    );
  }
}
