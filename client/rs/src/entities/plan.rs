use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{action::Action, reference::ReferenceInfo};

/// Either a fixed protection flag, or a transition the change itself is
/// making. Accepts both the native `bool` shape and the JSON-decoded
/// `{"old": bool, "new": bool}` object, per §6: implementations must
/// accept both.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Protection {
  Fixed(bool),
  Transition { old: bool, new: bool },
}

impl Protection {
  /// The protection value that should hold after this change applies.
  pub fn effective(&self) -> bool {
    match self {
      Self::Fixed(b) => *b,
      Self::Transition { new, .. } => *new,
    }
  }

  /// True when this is exactly the "un-protect" transition, the one
  /// case a protected resource is still allowed to be mutated.
  pub fn is_unprotect_transition(&self) -> bool {
    matches!(
      self,
      Self::Transition {
        old: true,
        new: false
      }
    )
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParentRef {
  #[serde(default)]
  pub r#ref: Option<String>,
  #[serde(default)]
  pub id: Option<String>,
}

/// `gateway_services` declaration carried by an EXTERNAL_TOOL change:
/// the ref a later change may depend on, and the selector used to find
/// it among the control plane's gateway services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayServiceDeclaration {
  pub r#ref: String,
  pub selector_name: String,
}

/// Fields specific to an EXTERNAL_TOOL (`deck`) step. Only populated
/// when `action == ExternalTool`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalToolSpec {
  #[serde(default)]
  pub control_plane_ref: Option<String>,
  #[serde(default)]
  pub control_plane_id: Option<String>,
  #[serde(default)]
  pub control_plane_name: Option<String>,
  #[serde(default)]
  pub files: Vec<String>,
  #[serde(default)]
  pub flags: Vec<String>,
  /// Relative to the plan's base directory unless absolute.
  #[serde(default)]
  pub work_dir: Option<String>,
  #[serde(default)]
  pub gateway_services: Vec<GatewayServiceDeclaration>,
}

/// One unit of work: a CREATE/UPDATE/DELETE/EXTERNAL_TOOL against a
/// single resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedChange {
  pub id: String,
  pub action: Action,
  pub resource_type: String,
  pub resource_ref: String,
  #[serde(default)]
  pub resource_id: Option<String>,
  /// Declared properties for this change. Sparse for UPDATE: only keys
  /// that actually changed are present. Accepts both natively-typed and
  /// JSON-decoded value shapes (bool, int, string/null, nested maps).
  #[serde(default)]
  pub fields: IndexMap<String, serde_json::Value>,
  #[serde(default)]
  pub references: IndexMap<String, ReferenceInfo>,
  #[serde(default)]
  pub parent: Option<ParentRef>,
  #[serde(default)]
  pub depends_on: Vec<String>,
  #[serde(default)]
  pub protection: Option<Protection>,
  #[serde(default)]
  pub namespace: String,
  #[serde(default)]
  pub external_tool: Option<ExternalToolSpec>,
}

impl PlannedChange {
  pub fn field_str(&self, key: &str) -> Option<&str> {
    self.fields.get(key).and_then(|v| v.as_str())
  }

  pub fn is_singleton_child(&self) -> bool {
    matches!(
      self.resource_type.as_str(),
      "portal_customization"
        | "portal_auth_settings"
        | "portal_asset_logo"
        | "portal_asset_favicon"
    )
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanMode {
  Apply,
  Sync,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanMetadata {
  pub mode: PlanMode,
  /// Directory the plan's declarative source was loaded from; used to
  /// resolve `external_tool.work_dir` and file paths when relative.
  #[serde(default)]
  pub base_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
  pub metadata: PlanMetadata,
  pub changes: Vec<PlannedChange>,
  pub execution_order: Vec<String>,
}

impl Plan {
  pub fn change(&self, id: &str) -> Option<&PlannedChange> {
    self.changes.iter().find(|c| c.id == id)
  }
}
