use serde::{Deserialize, Serialize};

use super::labels::Labels;

/// A resource as fetched from the platform. `raw` keeps the rest of the
/// payload so adapters which need extra fields (e.g. `slug_path` for
/// documents) don't each need their own response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteResource {
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub labels: Labels,
  #[serde(flatten)]
  pub raw: serde_json::Map<String, serde_json::Value>,
}

impl RemoteResource {
  pub fn is_managed(&self) -> bool {
    self.labels.get(super::labels::LABEL_MANAGED).map(String::as_str)
      == Some("true")
  }

  pub fn is_protected(&self) -> bool {
    self
      .labels
      .get(super::labels::LABEL_PROTECTED)
      .map(String::as_str)
      == Some("true")
  }

  pub fn raw_str(&self, key: &str) -> Option<&str> {
    self.raw.get(key).and_then(|v| v.as_str())
  }
}
