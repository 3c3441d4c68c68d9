use async_trait::async_trait;

use crate::{entities::ResourceKind, error::ClientError};

/// The executor's only window onto the platform. Narrow by design: one
/// shape per (resource kind x operation) it actually issues, so adapters
/// never reach past it to a raw HTTP client.
///
/// Implementations own pagination for `list_all`/`list_managed`, must
/// filter `list_managed` to resources whose labels carry `managed=true`
/// (so DELETE can never touch an unmanaged resource), and must surface a
/// 404 from `get_by_name`/`get_by_id` as `Ok(None)`, never as an error.
#[async_trait]
pub trait StateClient: Send + Sync {
  async fn create(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
    body: serde_json::Value,
  ) -> Result<crate::entities::RemoteResource, ClientError>;

  async fn update(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
    id: &str,
    body: serde_json::Value,
  ) -> Result<crate::entities::RemoteResource, ClientError>;

  /// Idempotent: deleting an id the platform doesn't have is success,
  /// not an error (the caller is expected to have already checked
  /// existence via `get_by_id`/`get_by_name` where that matters).
  async fn delete(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
    id: &str,
  ) -> Result<(), ClientError>;

  async fn get_by_id(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
    id: &str,
  ) -> Result<Option<crate::entities::RemoteResource>, ClientError>;

  async fn get_by_name(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
    name: &str,
  ) -> Result<Option<crate::entities::RemoteResource>, ClientError>;

  /// Full listing of a parent's children, used to seed the reference
  /// resolver's hierarchy cache (portal pages, API documents).
  async fn list_all(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
  ) -> Result<Vec<crate::entities::RemoteResource>, ClientError>;

  /// Listing restricted to resources this tool manages. Used by DELETE
  /// paths and by the control-plane group membership reconciler.
  async fn list_managed(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
  ) -> Result<Vec<crate::entities::RemoteResource>, ClientError>;

  /// Idempotently sets a control-plane group's membership to exactly
  /// `member_ids`.
  async fn upsert_group_membership(
    &self,
    group_id: &str,
    member_ids: Vec<String>,
  ) -> Result<(), ClientError>;

  /// Lists a control plane's gateway services, for the external-tool
  /// step's post-resolution of `gateway_services` declarations.
  async fn list_gateway_services(
    &self,
    control_plane_id: &str,
  ) -> Result<Vec<crate::entities::RemoteResource>, ClientError>;
}
