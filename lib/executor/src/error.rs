use kongctl_client::ClientError;
use thiserror::Error;

/// Failure taxonomy by behavior, matching how the executor needs to
/// react rather than how an error happened to originate.
#[derive(Debug, Error)]
pub enum ExecutorError {
  #[error("change {change_id} references unknown change id in execution_order")]
  UnknownChange { change_id: String },

  #[error("{resource_type} '{resource_ref}': resource_id is required for {action}")]
  MissingResourceId {
    resource_type: String,
    resource_ref: String,
    action: &'static str,
  },

  #[error("{resource_type} '{name}' already exists; planner should have emitted UPDATE")]
  AlreadyExists {
    resource_type: String,
    name: String,
  },

  #[error("{resource_type} '{resource_ref}' no longer exists on the platform")]
  NoLongerExists {
    resource_type: String,
    resource_ref: String,
  },

  #[error("{resource_type} '{resource_ref}' is protected and cannot be updated")]
  Protected {
    resource_type: String,
    resource_ref: String,
  },

  #[error("{resource_type} '{resource_ref}' is not managed by kongctl and cannot be deleted")]
  NotManaged {
    resource_type: String,
    resource_ref: String,
  },

  #[error("failed to resolve reference '{r#ref}' ({lookup_value}) after retry: {source}")]
  Resolution {
    r#ref: String,
    lookup_value: String,
    #[source]
    source: ClientError,
  },

  #[error("failed to resolve reference '{r#ref}': not found via lookup '{lookup_value}'")]
  ResolutionNotFound { r#ref: String, lookup_value: String },

  #[error("one or more array reference entries for '{field}' failed to resolve")]
  ArrayResolution { field: String },

  #[error("unknown resource type '{0}'")]
  UnknownResourceType(String),

  #[error("{resource_type} is declared but not supported by this platform surface")]
  NotSupported { resource_type: String },

  #[error(transparent)]
  Client(#[from] ClientError),

  #[error("at most one api specification is allowed per API; remove the extra api_version before creating a new one")]
  DuplicateApiSpecification,

  #[error("external tool failed: {message}\n--- stdout (truncated) ---\n{stdout}\n--- stderr (truncated) ---\n{stderr}")]
  ExternalTool {
    message: String,
    stdout: String,
    stderr: String,
  },

  #[error("external tool step is missing a control plane reference or id")]
  ExternalToolMissingControlPlane,

  #[error("external tool file list entry looks like a flag: '{0}'")]
  ExternalToolFileLooksLikeFlag(String),

  #[error("external tool flag does not start with '-': '{0}'")]
  ExternalToolInvalidFlag(String),

  #[error("expected exactly one gateway service named '{name}', found {found}")]
  GatewayServiceLookup { name: String, found: usize },

  #[error(transparent)]
  Other(#[from] anyhow::Error),
}
