use chrono::Utc;
use kongctl_client::entities::{
  LABEL_LAST_UPDATED, LABEL_MANAGED, LABEL_NAMESPACE, LABEL_PROTECTED,
  LabelPatch, Labels, is_kongctl_label,
};

/// `20060102-150405Z`: UTC date and time with no separators except the
/// `-` between them, trailing `Z`.
fn last_updated_timestamp() -> String {
  Utc::now().format("%Y%m%d-%H%M%SZ").to_string()
}

/// Labels for a CREATE: user labels plus the four reserved keys for
/// this run.
pub fn build_create_labels(
  user_labels: &Labels,
  namespace: &str,
  protected: bool,
) -> Labels {
  let mut labels = user_labels.clone();
  labels.insert(LABEL_MANAGED.to_string(), "true".to_string());
  labels.insert(LABEL_NAMESPACE.to_string(), namespace.to_string());
  labels
    .insert(LABEL_LAST_UPDATED.to_string(), last_updated_timestamp());
  labels.insert(LABEL_PROTECTED.to_string(), protected.to_string());
  labels
}

/// Labels for an UPDATE: every desired user label is present; every
/// current user label absent from `desired` is tombstoned so the
/// platform removes it; reserved keys are rewritten to this run's
/// values.
pub fn build_update_labels(
  desired: &Labels,
  current: &Labels,
  namespace: &str,
  protected: bool,
) -> LabelPatch {
  let mut patch: LabelPatch = LabelPatch::new();

  for (k, v) in desired {
    if !is_kongctl_label(k) {
      patch.insert(k.clone(), Some(v.clone()));
    }
  }

  for k in current.keys() {
    if !is_kongctl_label(k) && !desired.contains_key(k) {
      patch.insert(k.clone(), None);
    }
  }

  patch
    .insert(LABEL_MANAGED.to_string(), Some("true".to_string()));
  patch.insert(
    LABEL_NAMESPACE.to_string(),
    Some(namespace.to_string()),
  );
  patch.insert(
    LABEL_LAST_UPDATED.to_string(),
    Some(last_updated_timestamp()),
  );
  patch.insert(
    LABEL_PROTECTED.to_string(),
    Some(protected.to_string()),
  );

  patch
}

#[cfg(test)]
mod tests {
  use super::*;

  fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  #[test]
  fn create_labels_carry_reserved_keys() {
    let user = labels(&[("team", "payments")]);
    let built = build_create_labels(&user, "default", false);
    assert_eq!(built.get("managed").map(String::as_str), Some("true"));
    assert_eq!(
      built.get("namespace").map(String::as_str),
      Some("default")
    );
    assert_eq!(
      built.get("protected").map(String::as_str),
      Some("false")
    );
    assert!(built.contains_key("last-updated"));
    assert_eq!(
      built.get("team").map(String::as_str),
      Some("payments")
    );
  }

  #[test]
  fn update_labels_tombstone_removed_user_labels() {
    let desired = labels(&[("team", "payments")]);
    let current = labels(&[
      ("team", "payments"),
      ("old-label", "stale"),
      ("managed", "true"),
    ]);
    let patch = build_update_labels(&desired, &current, "default", true);
    assert_eq!(patch.get("team"), Some(&Some("payments".to_string())));
    assert_eq!(patch.get("old-label"), Some(&None));
    assert_eq!(
      patch.get("protected"),
      Some(&Some("true".to_string()))
    );
  }
}
