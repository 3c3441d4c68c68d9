use std::sync::Arc;

use kongctl_client::{
  StateClient,
  entities::{Action, ParentRef, Plan, PlannedChange, ResourceKind},
};
use tokio_util::sync::CancellationToken;

use crate::{
  adapter, cache_state::ExecutorState, error::ExecutorError,
  external_tool::{self, Runner},
  reporter::Reporter,
  result::{
    ChangeApplied, ChangeError, ExecutionResult, Validation,
    ValidationResult, ValidationStatus,
  },
  validation,
};

/// Ties the state client, reference resolver state, reporter and
/// external-tool runner together into the one entry point: `execute`.
pub struct Executor {
  client: Arc<dyn StateClient>,
  runner: Arc<dyn Runner>,
  reporter: Arc<dyn Reporter>,
  token: String,
  base_url: String,
  state: ExecutorState,
  cancel: CancellationToken,
}

impl Executor {
  pub fn new(
    client: Arc<dyn StateClient>,
    runner: Arc<dyn Runner>,
    reporter: Arc<dyn Reporter>,
    token: impl Into<String>,
    base_url: impl Into<String>,
  ) -> Self {
    Self {
      client,
      runner,
      reporter,
      token: token.into(),
      base_url: base_url.into(),
      state: ExecutorState::default(),
      cancel: CancellationToken::new(),
    }
  }

  /// A clone of this run's cancellation token. Triggering it (e.g. from
  /// a `ctrl_c` handler racing `execute`) stops the executor from
  /// issuing any change not already in flight; the change being applied
  /// when cancellation fires still runs to completion and is recorded
  /// normally.
  pub fn cancel_handle(&self) -> CancellationToken {
    self.cancel.clone()
  }

  /// Applies every change in `plan.execution_order`. Never halts early:
  /// a failure on one change is recorded and the run proceeds. Mutates
  /// `plan.changes` in place, both to back-propagate resolved CREATE
  /// ids into later references and to reorder them to match
  /// `execution_order` once, up front, so "later in the run" is a
  /// plain slice from here on.
  pub async fn execute(
    &self,
    plan: &mut Plan,
    dry_run: bool,
  ) -> ExecutionResult {
    let mut result = ExecutionResult::new(dry_run);
    self.reporter.start_execution(plan);

    let mut ordered = Vec::with_capacity(plan.execution_order.len());
    for id in &plan.execution_order {
      match plan.changes.iter().position(|c| &c.id == id) {
        Some(pos) => ordered.push(plan.changes[pos].clone()),
        None => {
          result.failure_count += 1;
          result.errors.push(ChangeError {
            change_id: id.clone(),
            resource_type: String::new(),
            resource_name: String::new(),
            resource_ref: String::new(),
            action: Action::Create,
            error: ExecutorError::UnknownChange {
              change_id: id.clone(),
            }
            .to_string(),
          });
        }
      }
    }
    plan.changes = ordered;

    for i in 0..plan.changes.len() {
      if self.cancel.is_cancelled() {
        let change = &plan.changes[i];
        self.reporter.skip_change(change, "execution cancelled");
        result.skipped_count += 1;
        continue;
      }
      self.execute_one(plan, i, dry_run, &mut result).await;
    }

    self.reporter.finish_execution(&result);
    result
  }

  async fn execute_one(
    &self,
    plan: &mut Plan,
    i: usize,
    dry_run: bool,
    result: &mut ExecutionResult,
  ) {
    let plan_mode = plan.metadata.mode;
    let base_dir = plan.metadata.base_dir.clone();
    let (head, tail) = plan.changes.split_at_mut(i + 1);
    let change = &mut head[i];
    self.reporter.start_change(change);

    if change.action == Action::ExternalTool {
      self
        .execute_external_tool_change(
          change, tail, plan_mode, base_dir, dry_run, result,
        )
        .await;
      return;
    }

    let Some(kind) = ResourceKind::from_tag(&change.resource_type)
    else {
      let err = ExecutorError::UnknownResourceType(
        change.resource_type.clone(),
      );
      self.record_pre_dispatch_failure(change, err, dry_run, result);
      return;
    };

    let parent_id =
      match self.resolve_parent_id(kind, change.parent.as_ref()).await {
        Ok(id) => id,
        Err(err) => {
          self.record_pre_dispatch_failure(change, err, dry_run, result);
          return;
        }
      };

    if dry_run {
      let verdict = validation::pre_validate(
        self.client.as_ref(),
        change,
        kind,
        parent_id.as_deref(),
      )
      .await;
      self.record_validation(change, verdict, result);
      return;
    }

    let pre = match validation::pre_validate(
      self.client.as_ref(),
      change,
      kind,
      parent_id.as_deref(),
    )
    .await
    {
      Ok(pre) => pre,
      Err(err) => {
        self.record_failure(change, &err, result);
        return;
      }
    };

    match adapter::apply_change(
      self.client.as_ref(),
      &self.state,
      change,
      kind,
      parent_id.as_deref(),
      pre.current,
    )
    .await
    {
      Ok(maybe_id) => {
        if let Some(id) = &maybe_id {
          if change.action == Action::Create {
            self
              .state
              .record_created(kind, &change.resource_ref, &change.id, id)
              .await;
          }
          result.changes_applied.push(ChangeApplied {
            change_id: change.id.clone(),
            resource_type: change.resource_type.clone(),
            resource_name: change
              .field_str("name")
              .unwrap_or_default()
              .to_string(),
            resource_ref: change.resource_ref.clone(),
            action: change.action,
            resource_id: id.clone(),
          });
        }
        result.success_count += 1;
        self.reporter.complete_change(change, None);

        if change.action == Action::Create
          && let Some(id) = maybe_id
        {
          back_propagate(tail, kind, &change.resource_ref, &id);
        }
      }
      Err(err) => {
        self.record_failure(change, &err, result);
      }
    }
  }

  async fn execute_external_tool_change(
    &self,
    change: &mut PlannedChange,
    tail: &mut [PlannedChange],
    plan_mode: kongctl_client::entities::PlanMode,
    base_dir: Option<String>,
    dry_run: bool,
    result: &mut ExecutionResult,
  ) {
    let Some(spec) = change.external_tool.clone() else {
      let err = ExecutorError::Other(anyhow::anyhow!(
        "EXTERNAL_TOOL change is missing its external_tool spec"
      ));
      self.record_failure(change, &err, result);
      return;
    };

    if dry_run {
      let verdict = external_tool::validate_dry_run(
        self.client.as_ref(),
        &self.state,
        &spec,
      )
      .await;
      self.record_validation(change, verdict, result);
      return;
    }

    match external_tool::execute_external_tool(
      self.client.as_ref(),
      &self.state,
      &spec,
      plan_mode,
      base_dir.as_deref(),
      &self.token,
      &self.base_url,
      self.runner.as_ref(),
      tail,
    )
    .await
    {
      Ok(control_plane_id) => {
        result.changes_applied.push(ChangeApplied {
          change_id: change.id.clone(),
          resource_type: change.resource_type.clone(),
          resource_name: spec
            .control_plane_name
            .clone()
            .unwrap_or_default(),
          resource_ref: change.resource_ref.clone(),
          action: change.action,
          resource_id: control_plane_id,
        });
        result.success_count += 1;
        self.reporter.complete_change(change, None);
      }
      Err(err) => {
        self.record_failure(change, &err, result);
      }
    }
  }

  async fn resolve_parent_id(
    &self,
    kind: ResourceKind,
    parent: Option<&ParentRef>,
  ) -> Result<Option<String>, ExecutorError> {
    let Some(parent_kind) = kind.parent_kind() else {
      return Ok(None);
    };
    let Some(parent) = parent else {
      return Err(ExecutorError::Other(anyhow::anyhow!(
        "{} requires a parent reference",
        kind
      )));
    };
    if let Some(id) = &parent.id {
      return Ok(Some(id.clone()));
    }
    let Some(r#ref) = &parent.r#ref else {
      return Err(ExecutorError::Other(anyhow::anyhow!(
        "{} parent reference has neither id nor ref",
        kind
      )));
    };
    if let Some(id) = self.state.lookup_ref(parent_kind, r#ref).await {
      return Ok(Some(id));
    }
    let found = self
      .client
      .get_by_name(parent_kind, None, r#ref)
      .await?
      .ok_or_else(|| ExecutorError::NoLongerExists {
        resource_type: parent_kind.as_tag().to_string(),
        resource_ref: r#ref.clone(),
      })?;
    self.state.cache_ref(parent_kind, r#ref, &found.id).await;
    Ok(Some(found.id))
  }

  /// A failure discovered before dispatch (unknown resource type, an
  /// unresolvable parent reference) still has to land in
  /// `validation_results` under dry-run, per §8's "every change appears
  /// in `ValidationResults`" invariant — routed to `record_validation`
  /// there instead of `record_failure`.
  fn record_pre_dispatch_failure(
    &self,
    change: &PlannedChange,
    err: ExecutorError,
    dry_run: bool,
    result: &mut ExecutionResult,
  ) {
    if dry_run {
      self.record_validation(change, Err::<(), _>(err), result);
    } else {
      self.record_failure(change, &err, result);
    }
  }

  fn record_failure(
    &self,
    change: &PlannedChange,
    err: &ExecutorError,
    result: &mut ExecutionResult,
  ) {
    result.failure_count += 1;
    result.errors.push(ChangeError {
      change_id: change.id.clone(),
      resource_type: change.resource_type.clone(),
      resource_name: change.field_str("name").unwrap_or_default().to_string(),
      resource_ref: change.resource_ref.clone(),
      action: change.action,
      error: err.to_string(),
    });
    self.reporter.complete_change(change, Some(err));
  }

  fn record_validation<T>(
    &self,
    change: &PlannedChange,
    verdict: Result<T, ExecutorError>,
    result: &mut ExecutionResult,
  ) {
    let (status, validation, message) = match &verdict {
      Ok(_) => (ValidationStatus::WouldSucceed, Validation::Passed, None),
      Err(err) => (
        ValidationStatus::WouldFail,
        Validation::Failed,
        Some(err.to_string()),
      ),
    };
    result.validation_results.push(ValidationResult {
      change_id: change.id.clone(),
      resource_type: change.resource_type.clone(),
      resource_ref: change.resource_ref.clone(),
      action: change.action,
      status,
      validation,
      message,
    });
    match &verdict {
      Ok(_) => {
        result.success_count += 1;
        self.reporter.complete_change(change, None);
      }
      Err(err) => {
        result.failure_count += 1;
        self.reporter.complete_change(change, Some(err));
      }
    }
  }
}

/// Rewrites `References[k].ID` in place on every change positioned
/// later in the run whose `References[k].Ref` names the resource ref
/// that was just created.
fn back_propagate(
  tail: &mut [PlannedChange],
  kind: ResourceKind,
  created_ref: &str,
  id: &str,
) {
  for change in tail.iter_mut() {
    for (key, info) in change.references.iter_mut() {
      if info.r#ref != created_ref {
        continue;
      }
      if adapter::reference_key_to_kind(key) != Some(kind) {
        continue;
      }
      info.id = Some(id.to_string());
    }
  }
}
