use kongctl_client::entities::Action;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
  WouldSucceed,
  WouldFail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Validation {
  Passed,
  Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
  pub change_id: String,
  pub resource_type: String,
  pub resource_ref: String,
  pub action: Action,
  pub status: ValidationStatus,
  pub validation: Validation,
  pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeError {
  pub change_id: String,
  pub resource_type: String,
  pub resource_name: String,
  pub resource_ref: String,
  pub action: Action,
  pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeApplied {
  pub change_id: String,
  pub resource_type: String,
  pub resource_name: String,
  pub resource_ref: String,
  pub action: Action,
  pub resource_id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionResult {
  pub dry_run: bool,
  pub success_count: u32,
  pub failure_count: u32,
  pub skipped_count: u32,
  pub errors: Vec<ChangeError>,
  pub changes_applied: Vec<ChangeApplied>,
  pub validation_results: Vec<ValidationResult>,
}

impl ExecutionResult {
  pub fn new(dry_run: bool) -> Self {
    Self {
      dry_run,
      ..Default::default()
    }
  }

  /// `success_count + failure_count + skipped_count == total`, checked
  /// by the executor's own tests against every `ExecutionOrder` length.
  pub fn total(&self) -> u32 {
    self.success_count + self.failure_count + self.skipped_count
  }
}
