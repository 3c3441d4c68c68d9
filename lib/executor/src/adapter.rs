use kongctl_client::{
  ClientError, StateClient,
  entities::{
    Action, Labels, PlannedChange, RemoteResource, ResourceKind,
    extract_labels_from_value,
  },
};
use serde_json::{Map, Value};

use crate::{
  auth_strategy, cache_state::ExecutorState, control_plane,
  error::ExecutorError, label, resolver::ReferenceResolver,
};

/// Writes a resolved reference value into the wire body, honoring one
/// level of dotted nesting (`"service.id"` → `body["service"]["id"]`).
fn write_into_body(body: &mut Map<String, Value>, key: &str, value: Value) {
  if let Some((head, tail)) = key.split_once('.') {
    let entry = body
      .entry(head.to_string())
      .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(nested) = entry {
      nested.insert(tail.to_string(), value);
    }
  } else {
    body.insert(key.to_string(), value);
  }
}

/// The platform's own wording for "this API already has a spec
/// document attached" is an opaque 409; rewritten with a hint a user
/// can act on (§7).
fn rewrite_duplicate_spec_error(
  kind: ResourceKind,
  err: ExecutorError,
) -> ExecutorError {
  if kind != ResourceKind::ApiVersion {
    return err;
  }
  let is_duplicate_spec = matches!(
    &err,
    ExecutorError::Client(ClientError::Api { body, .. })
      if body.to_lowercase().contains("at most one api specification")
  );
  if is_duplicate_spec {
    ExecutorError::DuplicateApiSpecification
  } else {
    err
  }
}

/// Maps a `References` key to the resource kind it names, per the
/// convention that every key is suffixed `_id` or `_ids`.
pub(crate) fn reference_key_to_kind(key: &str) -> Option<ResourceKind> {
  let stripped =
    key.strip_suffix("_ids").or_else(|| key.strip_suffix("_id"))?;
  ResourceKind::from_tag(stripped)
}

/// Keys resolved by a bespoke step rather than the generic reference
/// loop: `members` by the control-plane membership reconciler,
/// `service.id` by the external-tool step's post-resolution.
fn is_bespoke_reference_key(key: &str) -> bool {
  key == "members" || key == "service.id"
}

/// Applies a validated, non-external-tool change: resolves the
/// remaining field-level references, rewrites labels, and issues the
/// single state-client call the action requires. Returns the resulting
/// id for CREATE/UPDATE (`None` for DELETE, or for an UPDATE on a
/// singleton child which has no id of its own). Callers must run
/// `validation::pre_validate` first; it rejects unsupported resource
/// kinds before this ever dispatches a wire call.
pub async fn apply_change(
  client: &dyn StateClient,
  state: &ExecutorState,
  change: &PlannedChange,
  kind: ResourceKind,
  parent_id: Option<&str>,
  current: Option<RemoteResource>,
) -> Result<Option<String>, ExecutorError> {
  if change.action == Action::Delete {
    let Some(current) = current else {
      return Ok(None);
    };
    let id = change.resource_id.as_deref().unwrap_or(&current.id);
    client.delete(kind, parent_id, id).await?;
    invalidate_parent_hierarchy(state, kind, parent_id).await;
    return Ok(None);
  }

  let resolver = ReferenceResolver::new(client, state);
  let mut body: Map<String, Value> = change
    .fields
    .iter()
    .filter(|(k, _)| k.as_str() != "labels")
    .map(|(k, v)| (k.clone(), v.clone()))
    .collect();

  for (key, info) in &change.references {
    if is_bespoke_reference_key(key) {
      continue;
    }
    let Some(ref_kind) = reference_key_to_kind(key) else {
      return Err(ExecutorError::Other(anyhow::anyhow!(
        "reference key '{key}' does not name a known resource type"
      )));
    };
    if info.is_array {
      let ids = resolver
        .resolve_array(ref_kind, None, key, info)
        .await?;
      write_into_body(
        &mut body,
        key,
        Value::Array(ids.into_iter().map(Value::String).collect()),
      );
    } else {
      let id = resolver.resolve_scalar(ref_kind, None, info).await?;
      write_into_body(&mut body, key, Value::String(id));
    }
  }

  if kind == ResourceKind::ApplicationAuthStrategy {
    let validated = auth_strategy::validate(&body)?;
    let normalized = serde_json::to_value(validated)
      .unwrap_or(Value::Null);
    if let Value::Object(normalized) = normalized {
      body.extend(normalized);
    }
  }

  let user_labels: Labels =
    extract_labels_from_value(change.fields.get("labels"));
  let namespace = if change.namespace.is_empty() {
    "default"
  } else {
    change.namespace.as_str()
  };
  let protected =
    change.protection.as_ref().map(|p| p.effective()).unwrap_or(false);

  let id = match change.action {
    Action::Create => {
      let labels =
        label::build_create_labels(&user_labels, namespace, protected);
      body.insert(
        "labels".to_string(),
        serde_json::to_value(labels).unwrap_or(Value::Null),
      );
      let created = client
        .create(kind, parent_id, Value::Object(body))
        .await
        .map_err(|e| rewrite_duplicate_spec_error(kind, e.into()))?;
      reconcile_membership_if_group(
        client, state, kind, &created.id, change,
      )
      .await?;
      created.id
    }
    Action::Update => {
      let current_labels =
        current.as_ref().map(|c| c.labels.clone()).unwrap_or_default();
      let patch = label::build_update_labels(
        &user_labels,
        &current_labels,
        namespace,
        protected,
      );
      body.insert(
        "labels".to_string(),
        serde_json::to_value(patch).unwrap_or(Value::Null),
      );
      let target_id = if kind.is_singleton() {
        String::new()
      } else {
        change
          .resource_id
          .clone()
          .or_else(|| current.as_ref().map(|c| c.id.clone()))
          .ok_or_else(|| ExecutorError::MissingResourceId {
            resource_type: change.resource_type.clone(),
            resource_ref: change.resource_ref.clone(),
            action: "UPDATE",
          })?
      };
      let updated = client
        .update(kind, parent_id, &target_id, Value::Object(body))
        .await?;
      reconcile_membership_if_group(
        client, state, kind, &updated.id, change,
      )
      .await?;
      if kind.is_singleton() {
        return Ok(parent_id.map(str::to_string));
      }
      updated.id
    }
    Action::Delete | Action::ExternalTool => unreachable!(
      "handled above or by the external-tool step"
    ),
  };

  invalidate_parent_hierarchy(state, kind, parent_id).await;
  Ok(Some(id))
}

async fn reconcile_membership_if_group(
  client: &dyn StateClient,
  state: &ExecutorState,
  kind: ResourceKind,
  group_id: &str,
  change: &PlannedChange,
) -> Result<(), ExecutorError> {
  if !matches!(
    kind,
    ResourceKind::ControlPlane | ResourceKind::EventGatewayControlPlane
  ) {
    return Ok(());
  }
  let Some(members) = change.references.get("members") else {
    return Ok(());
  };
  control_plane::reconcile_membership(client, state, group_id, members)
    .await
}

async fn invalidate_parent_hierarchy(
  state: &ExecutorState,
  kind: ResourceKind,
  parent_id: Option<&str>,
) {
  if let (
    ResourceKind::ApiDocument | ResourceKind::PortalPage,
    Some(parent_id),
  ) = (kind, parent_id)
  {
    state.invalidate_hierarchy(kind, parent_id).await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn api_status_err(body: &str) -> ExecutorError {
    ExecutorError::Client(ClientError::Api {
      resource_type: "api_version".to_string(),
      operation: "create".to_string(),
      status: reqwest::StatusCode::CONFLICT,
      body: body.to_string(),
    })
  }

  #[test]
  fn rewrites_duplicate_spec_error_on_api_version() {
    let err = api_status_err(
      "At most one API specification document is allowed per API",
    );
    let rewritten =
      rewrite_duplicate_spec_error(ResourceKind::ApiVersion, err);
    assert!(matches!(
      rewritten,
      ExecutorError::DuplicateApiSpecification
    ));
  }

  #[test]
  fn leaves_unrelated_errors_on_api_version_untouched() {
    let err = api_status_err("some other conflict");
    let rewritten =
      rewrite_duplicate_spec_error(ResourceKind::ApiVersion, err);
    assert!(matches!(rewritten, ExecutorError::Client(_)));
  }

  #[test]
  fn does_not_rewrite_on_other_resource_kinds() {
    let err = api_status_err(
      "At most one API specification document is allowed per API",
    );
    let rewritten = rewrite_duplicate_spec_error(ResourceKind::Api, err);
    assert!(matches!(rewritten, ExecutorError::Client(_)));
  }
}
