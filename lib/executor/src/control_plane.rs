use kongctl_client::{StateClient, entities::ResourceKind};

use crate::{
  cache_state::ExecutorState, error::ExecutorError,
  resolver::ReferenceResolver,
};

/// After a control-plane group's create/update, reconciles its member
/// set to exactly the desired list: array references resolved
/// individually, then idempotently upserted in one call.
pub async fn reconcile_membership(
  client: &dyn StateClient,
  state: &ExecutorState,
  group_id: &str,
  members: &kongctl_client::entities::ReferenceInfo,
) -> Result<(), ExecutorError> {
  let resolver = ReferenceResolver::new(client, state);
  let member_ids = resolver
    .resolve_array(ResourceKind::ControlPlane, None, "members", members)
    .await?;
  client
    .upsert_group_membership(group_id, member_ids)
    .await?;
  Ok(())
}
