use kongctl_client::{
  StateClient,
  entities::{Action, PlannedChange, RemoteResource, ResourceKind},
};

use crate::error::ExecutorError;

/// The live resource fetched while validating, reused by the dispatch
/// step so pre-validation never costs a second round trip.
pub struct PreValidated {
  pub current: Option<RemoteResource>,
}

/// Runs every pre-execution check from the spec's validation pass,
/// always performed -- including under dry-run -- against live state.
pub async fn pre_validate(
  client: &dyn StateClient,
  change: &PlannedChange,
  kind: ResourceKind,
  parent_id: Option<&str>,
) -> Result<PreValidated, ExecutorError> {
  if !kind.is_supported() {
    return Err(ExecutorError::NotSupported {
      resource_type: change.resource_type.clone(),
    });
  }

  match change.action {
    Action::Create => {
      if kind.supports_name_lookup()
        && let Some(name) = change.field_str("name")
        && let Some(existing) =
          client.get_by_name(kind, parent_id, name).await?
      {
        return Err(ExecutorError::AlreadyExists {
          resource_type: change.resource_type.clone(),
          name: existing.name,
        });
      }
      Ok(PreValidated { current: None })
    }
    Action::Update | Action::Delete => {
      if change.resource_id.is_none() && !change.is_singleton_child() {
        return Err(ExecutorError::MissingResourceId {
          resource_type: change.resource_type.clone(),
          resource_ref: change.resource_ref.clone(),
          action: if change.action == Action::Update {
            "UPDATE"
          } else {
            "DELETE"
          },
        });
      }

      let current = fetch_current(client, change, kind, parent_id)
        .await?;

      let Some(current) = current else {
        if change.action == Action::Delete {
          // Idempotent: nothing to delete is success.
          return Ok(PreValidated { current: None });
        }
        return Err(ExecutorError::NoLongerExists {
          resource_type: change.resource_type.clone(),
          resource_ref: change.resource_ref.clone(),
        });
      };

      if change.action == Action::Delete && !current.is_managed() {
        return Err(ExecutorError::NotManaged {
          resource_type: change.resource_type.clone(),
          resource_ref: change.resource_ref.clone(),
        });
      }

      if current.is_protected() {
        let is_unprotect = change
          .protection
          .as_ref()
          .map(|p| p.is_unprotect_transition())
          .unwrap_or(false);
        if !is_unprotect {
          return Err(ExecutorError::Protected {
            resource_type: change.resource_type.clone(),
            resource_ref: change.resource_ref.clone(),
          });
        }
      }

      Ok(PreValidated {
        current: Some(current),
      })
    }
    Action::ExternalTool => Ok(PreValidated { current: None }),
  }
}

async fn fetch_current(
  client: &dyn StateClient,
  change: &PlannedChange,
  kind: ResourceKind,
  parent_id: Option<&str>,
) -> Result<Option<RemoteResource>, ExecutorError> {
  if kind.is_singleton() {
    return client.get_by_id(kind, parent_id, "").await;
  }
  if let Some(id) = &change.resource_id {
    return client.get_by_id(kind, parent_id, id).await;
  }
  Ok(None)
}
