use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kongctl_client::{
  StateClient,
  entities::{
    ExternalToolSpec, PlanMode, PlannedChange, ResourceKind,
    format_placeholder,
  },
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{cache_state::ExecutorState, error::ExecutorError};

const MAX_EXCERPT_CHARS: usize = 2048;

fn truncate(s: &str) -> String {
  command::CommandOutput::truncated(s, MAX_EXCERPT_CHARS)
}

pub struct RunnerArgs {
  pub mode: &'static str,
  pub token: String,
  pub control_plane_name: String,
  pub base_url: String,
  pub work_dir: PathBuf,
  pub args: Vec<String>,
}

pub struct RunnerOutput {
  pub success: bool,
  pub stdout: String,
  pub stderr: String,
}

/// Abstracts invoking the external gateway-entity configuration tool
/// (`deck`) as a subprocess, so the executor's tests can substitute a
/// fake without spawning a real binary.
#[async_trait]
pub trait Runner: Send + Sync {
  async fn run(&self, args: RunnerArgs) -> RunnerOutput;
}

/// Default `Runner`, shelling out to the `deck` binary on `PATH`.
pub struct DeckRunner;

#[async_trait]
impl Runner for DeckRunner {
  async fn run(&self, args: RunnerArgs) -> RunnerOutput {
    let mut full_args = args.args.clone();
    full_args.extend([
      "--konnect-token".to_string(),
      args.token.clone(),
      "--konnect-control-plane-name".to_string(),
      args.control_plane_name.clone(),
      "--konnect-addr".to_string(),
      args.base_url.clone(),
    ]);
    let command =
      shlex::try_join(
        std::iter::once("deck").chain(full_args.iter().map(String::as_str)),
      )
      .unwrap_or_else(|_| "deck".to_string());
    let output =
      command::run_standard_command(&command, args.work_dir.as_path())
        .await;
    RunnerOutput {
      success: output.success(),
      stdout: output.stdout,
      stderr: output.stderr,
    }
  }
}

#[derive(Debug, Deserialize, Default)]
struct ToolSummary {
  #[serde(default)]
  created: Option<u64>,
  #[serde(default)]
  updated: Option<u64>,
  #[serde(default)]
  deleted: Option<u64>,
  #[serde(default)]
  creating: Option<u64>,
  #[serde(default)]
  updating: Option<u64>,
  #[serde(default)]
  deleting: Option<u64>,
  #[serde(default)]
  total: Option<u64>,
  #[serde(default)]
  warnings: Option<u64>,
  #[serde(default)]
  errors: Option<u64>,
}

fn looks_like_flag(s: &str) -> bool {
  s.starts_with('-')
}

/// Runs the EXTERNAL_TOOL step and back-propagates resolved gateway
/// service ids into later changes, per §4.5.
pub async fn execute_external_tool(
  client: &dyn StateClient,
  state: &ExecutorState,
  spec: &ExternalToolSpec,
  plan_mode: PlanMode,
  base_dir: Option<&str>,
  token: &str,
  base_url: &str,
  runner: &dyn Runner,
  later_changes: &mut [PlannedChange],
) -> Result<String, ExecutorError> {
  let control_plane_id =
    resolve_control_plane_id(client, state, spec).await?;
  let control_plane_name = resolve_control_plane_name(
    client,
    spec,
    &control_plane_id,
  )
  .await?;

  let mode = match plan_mode {
    PlanMode::Apply => "apply",
    PlanMode::Sync => "sync",
  };

  if spec.files.is_empty() {
    return Err(ExecutorError::Other(anyhow::anyhow!(
      "external tool step has no declarative input files"
    )));
  }
  for file in &spec.files {
    if looks_like_flag(file) {
      return Err(ExecutorError::ExternalToolFileLooksLikeFlag(
        file.clone(),
      ));
    }
  }
  if !spec.flags.is_empty() {
    for flag in &spec.flags {
      if !looks_like_flag(flag) {
        return Err(ExecutorError::ExternalToolInvalidFlag(
          flag.clone(),
        ));
      }
    }
  }

  let mut flags = spec.flags.clone();
  if !flags.iter().any(|f| f == "--json-output") {
    flags.push("--json-output".to_string());
  }
  if !flags.iter().any(|f| f == "--no-color") {
    flags.push("--no-color".to_string());
  }

  let work_dir = resolve_work_dir(spec.work_dir.as_deref(), base_dir);

  let mut args = vec!["gateway".to_string(), mode.to_string()];
  args.extend(flags);
  args.extend(spec.files.clone());

  let output = runner
    .run(RunnerArgs {
      mode,
      token: token.to_string(),
      control_plane_name,
      base_url: base_url.to_string(),
      work_dir,
      args,
    })
    .await;

  if !output.success {
    return Err(ExecutorError::ExternalTool {
      message: "external tool exited with a non-zero status"
        .to_string(),
      stdout: truncate(&output.stdout),
      stderr: truncate(&output.stderr),
    });
  }

  log_summary(&output.stdout);

  resolve_gateway_services(
    client,
    state,
    spec,
    &control_plane_id,
    later_changes,
  )
  .await?;

  Ok(control_plane_id)
}

/// The read-only half of `execute_external_tool`: resolves the control
/// plane and checks the file/flag lists, but never shells out and never
/// touches later changes' references.
pub async fn validate_dry_run(
  client: &dyn StateClient,
  state: &ExecutorState,
  spec: &ExternalToolSpec,
) -> Result<(), ExecutorError> {
  let control_plane_id =
    resolve_control_plane_id(client, state, spec).await?;
  resolve_control_plane_name(client, spec, &control_plane_id).await?;

  if spec.files.is_empty() {
    return Err(ExecutorError::Other(anyhow::anyhow!(
      "external tool step has no declarative input files"
    )));
  }
  for file in &spec.files {
    if looks_like_flag(file) {
      return Err(ExecutorError::ExternalToolFileLooksLikeFlag(
        file.clone(),
      ));
    }
  }
  for flag in &spec.flags {
    if !looks_like_flag(flag) {
      return Err(ExecutorError::ExternalToolInvalidFlag(flag.clone()));
    }
  }

  Ok(())
}

fn log_summary(stdout: &str) {
  match serde_json::from_str::<ToolSummary>(stdout) {
    Ok(summary) => tracing::info!(
      created = summary.created.or(summary.creating),
      updated = summary.updated.or(summary.updating),
      deleted = summary.deleted.or(summary.deleting),
      total = summary.total,
      warnings = summary.warnings,
      errors = summary.errors,
      "external tool summary"
    ),
    Err(_) => {
      tracing::debug!(stdout = %truncate(stdout), "external tool stdout");
    }
  }
}

async fn resolve_control_plane_id(
  client: &dyn StateClient,
  state: &ExecutorState,
  spec: &ExternalToolSpec,
) -> Result<String, ExecutorError> {
  if let Some(id) = &spec.control_plane_id
    && Uuid::parse_str(id).is_ok()
  {
    return Ok(id.clone());
  }
  let Some(r#ref) = &spec.control_plane_ref else {
    return Err(ExecutorError::ExternalToolMissingControlPlane);
  };
  if let Some(id) =
    state.lookup_ref(ResourceKind::ControlPlane, r#ref).await
  {
    return Ok(id);
  }
  let found = client
    .get_by_name(ResourceKind::ControlPlane, None, r#ref)
    .await?
    .ok_or(ExecutorError::ExternalToolMissingControlPlane)?;
  Ok(found.id)
}

async fn resolve_control_plane_name(
  client: &dyn StateClient,
  spec: &ExternalToolSpec,
  control_plane_id: &str,
) -> Result<String, ExecutorError> {
  if let Some(name) = &spec.control_plane_name {
    return Ok(name.clone());
  }
  let resource = client
    .get_by_id(ResourceKind::ControlPlane, None, control_plane_id)
    .await?
    .ok_or(ExecutorError::ExternalToolMissingControlPlane)?;
  Ok(resource.name)
}

fn resolve_work_dir(
  work_dir: Option<&str>,
  base_dir: Option<&str>,
) -> PathBuf {
  match work_dir {
    Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
    Some(dir) => {
      PathBuf::from(base_dir.unwrap_or(".")).join(dir)
    }
    None => PathBuf::from(base_dir.unwrap_or(".")),
  }
}

/// For each declared `gateway_services` entry that a later change
/// actually depends on, resolves it by name and mutates that change's
/// `service.id`/`service.control_plane_id` placeholders in place.
/// Declarations no later change references never trigger a list call.
async fn resolve_gateway_services(
  client: &dyn StateClient,
  state: &ExecutorState,
  spec: &ExternalToolSpec,
  control_plane_id: &str,
  later_changes: &mut [PlannedChange],
) -> Result<(), ExecutorError> {
  for decl in &spec.gateway_services {
    let placeholder = format_placeholder(&decl.r#ref, "id");
    let is_needed = later_changes.iter().any(|c| {
      c.fields
        .get("service")
        .and_then(|v| v.as_object())
        .and_then(|o| o.get("id"))
        .and_then(|v| v.as_str())
        == Some(placeholder.as_str())
    });
    if !is_needed {
      continue;
    }

    let services =
      client.list_gateway_services(control_plane_id).await?;
    let matches: Vec<_> = services
      .into_iter()
      .filter(|s| s.name == decl.selector_name)
      .collect();
    if matches.len() != 1 {
      return Err(ExecutorError::GatewayServiceLookup {
        name: decl.selector_name.clone(),
        found: matches.len(),
      });
    }
    let service_id = matches.into_iter().next().unwrap().id;
    state
      .cache_ref(ResourceKind::GatewayService, &decl.r#ref, &service_id)
      .await;

    for change in later_changes.iter_mut() {
      let Some(service) = change
        .fields
        .get_mut("service")
        .and_then(|v| v.as_object_mut())
      else {
        continue;
      };
      if service.get("id").and_then(|v| v.as_str())
        == Some(placeholder.as_str())
      {
        service.insert(
          "id".to_string(),
          serde_json::Value::String(service_id.clone()),
        );
        service.insert(
          "control_plane_id".to_string(),
          serde_json::Value::String(control_plane_id.to_string()),
        );
      }
    }
  }
  Ok(())
}
