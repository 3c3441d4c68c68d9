use std::collections::BTreeMap;

/// Reserved label keys written by every managed resource. Anything else
/// present on a resource's labels is a user label.
pub const LABEL_MANAGED: &str = "managed";
pub const LABEL_NAMESPACE: &str = "namespace";
pub const LABEL_LAST_UPDATED: &str = "last-updated";
pub const LABEL_PROTECTED: &str = "protected";

pub const RESERVED_LABEL_KEYS: [&str; 4] = [
  LABEL_MANAGED,
  LABEL_NAMESPACE,
  LABEL_LAST_UPDATED,
  LABEL_PROTECTED,
];

pub fn is_kongctl_label(key: &str) -> bool {
  RESERVED_LABEL_KEYS.contains(&key)
}

/// Labels as fetched from the platform: plain strings, present or absent.
pub type Labels = BTreeMap<String, String>;

/// Labels as sent on an UPDATE: `None` tombstones the key (the platform
/// removes it), `Some` sets or overwrites it.
pub type LabelPatch = BTreeMap<String, Option<String>>;

/// `ExtractLabelsFromField`: plan `Fields["labels"]` arrives as either a
/// `map<string,string>` or a `map<string,any>` depending on whether the
/// plan was produced natively or round-tripped through JSON. Non-string
/// values are dropped rather than rejected, matching the planner's own
/// leniency.
pub fn extract_labels_from_value(
  value: Option<&serde_json::Value>,
) -> Labels {
  let Some(serde_json::Value::Object(map)) = value else {
    return Labels::new();
  };
  map
    .iter()
    .filter_map(|(k, v)| match v {
      serde_json::Value::String(s) => Some((k.clone(), s.clone())),
      _ => None,
    })
    .collect()
}
