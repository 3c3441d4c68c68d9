use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The literal placeholder form `__REF__:<ref>#<field>` used by the
/// planner to denote an unresolved reference anywhere a scalar id is
/// expected. `<field>` is currently always `id`; the segment is reserved
/// for future per-attribute references.
const PLACEHOLDER_PREFIX: &str = "__REF__:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedReference {
  /// Already a concrete remote id.
  Direct(String),
  /// `__REF__:<ref>#<field>`, not yet resolved.
  Placeholder { r#ref: String, field: String },
}

/// Parses a scalar id slot, recognizing the placeholder form wherever it
/// appears. A literal `[unknown]` is treated the same as an empty id:
/// neither is usable without resolution.
pub fn parse_reference(raw: &str) -> ParsedReference {
  if let Some(rest) = raw.strip_prefix(PLACEHOLDER_PREFIX) {
    if let Some((r#ref, field)) = rest.split_once('#') {
      return ParsedReference::Placeholder {
        r#ref: r#ref.to_string(),
        field: field.to_string(),
      };
    }
    return ParsedReference::Placeholder {
      r#ref: rest.to_string(),
      field: "id".to_string(),
    };
  }
  ParsedReference::Direct(raw.to_string())
}

pub fn is_unresolved(id: &str) -> bool {
  id.is_empty()
    || id == "[unknown]"
    || id.starts_with(PLACEHOLDER_PREFIX)
}

pub fn format_placeholder(r#ref: &str, field: &str) -> String {
  format!("{PLACEHOLDER_PREFIX}{ref}#{field}")
}

/// A typed link from one change to another resource, resolved at
/// runtime to a remote id. Mirrors `ReferenceInfo` on the wire; accepts
/// both the scalar and array-valued shapes a plan may carry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceInfo {
  /// The author's symbolic name, possibly still in placeholder form.
  #[serde(default)]
  pub r#ref: String,
  /// Populated once resolved.
  #[serde(default)]
  pub id: Option<String>,
  /// Alternate lookup keys, e.g. `name`, `slug_path`.
  #[serde(default)]
  pub lookup_fields: BTreeMap<String, String>,
  #[serde(default)]
  pub is_array: bool,
  #[serde(default)]
  pub refs: Vec<String>,
  #[serde(default)]
  pub resolved_ids: Vec<Option<String>>,
  #[serde(default)]
  pub lookup_arrays: BTreeMap<String, Vec<String>>,
}

impl ReferenceInfo {
  /// Preferred lookup value for a by-name fallback: `name`, then
  /// `slug_path`/`slug` for documents and pages, else the raw ref.
  pub fn preferred_lookup_value(&self) -> &str {
    self
      .lookup_fields
      .get("name")
      .or_else(|| self.lookup_fields.get("slug_path"))
      .or_else(|| self.lookup_fields.get("slug"))
      .map(String::as_str)
      .unwrap_or(&self.r#ref)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_placeholder() {
    assert_eq!(
      parse_reference("__REF__:a1#id"),
      ParsedReference::Placeholder {
        r#ref: "a1".into(),
        field: "id".into()
      }
    );
  }

  #[test]
  fn parses_direct_id() {
    assert_eq!(
      parse_reference("abc-123"),
      ParsedReference::Direct("abc-123".into())
    );
  }

  #[test]
  fn recognizes_unresolved_forms() {
    assert!(is_unresolved(""));
    assert!(is_unresolved("[unknown]"));
    assert!(is_unresolved("__REF__:a1#id"));
    assert!(!is_unresolved("abc-123"));
  }
}
