use std::time::Duration;

use kongctl_client::{
  StateClient,
  entities::{
    ParsedReference, ReferenceInfo, ResourceKind, is_unresolved,
    parse_reference,
  },
};

use crate::{
  cache_state::{ExecutorState, Hierarchy},
  error::ExecutorError,
};

/// Resource kinds whose by-name lookup is really a slug-path lookup
/// into a cached parent/child hierarchy.
fn hierarchy_parent_field(kind: ResourceKind) -> Option<&'static str> {
  match kind {
    ResourceKind::ApiDocument => Some("parent_document_id"),
    ResourceKind::PortalPage => Some("parent_page_id"),
    _ => None,
  }
}

/// Resolves `ReferenceInfo`s to concrete remote ids: cross-resource
/// links that only become known at runtime, either because they were
/// just created in this run or because they already exist on the
/// platform.
pub struct ReferenceResolver<'a> {
  client: &'a dyn StateClient,
  state: &'a ExecutorState,
}

impl<'a> ReferenceResolver<'a> {
  pub fn new(
    client: &'a dyn StateClient,
    state: &'a ExecutorState,
  ) -> Self {
    Self { client, state }
  }

  /// Resolves one scalar reference slot to a concrete id.
  pub async fn resolve_scalar(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
    info: &ReferenceInfo,
  ) -> Result<String, ExecutorError> {
    if let Some(id) = &info.id
      && !is_unresolved(id)
    {
      return Ok(id.clone());
    }

    let r#ref = match parse_reference(&info.r#ref) {
      ParsedReference::Direct(id)
        if !is_unresolved(&id) =>
      {
        return Ok(id);
      }
      ParsedReference::Direct(r#ref) => r#ref,
      ParsedReference::Placeholder { r#ref, .. } => r#ref,
    };

    if let Some(id) = self.state.lookup_ref(kind, &r#ref).await {
      return Ok(id);
    }

    let lookup_value = info.preferred_lookup_value();

    let id = if let Some(parent_field) =
      hierarchy_parent_field(kind)
    {
      self
        .resolve_via_hierarchy(
          kind,
          parent_id.unwrap_or_default(),
          parent_field,
          lookup_value,
        )
        .await?
    } else {
      self
        .resolve_by_name_with_retry(kind, parent_id, lookup_value)
        .await?
    };

    self.state.cache_ref(kind, &r#ref, &id).await;
    Ok(id)
  }

  /// Bounded retry (3 attempts, linear backoff 0s/1s/2s) to tolerate
  /// eventual consistency on the platform's read-after-write.
  async fn resolve_by_name_with_retry(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
    lookup_value: &str,
  ) -> Result<String, ExecutorError> {
    let mut last_err = None;
    for attempt in 0..3u32 {
      if attempt > 0 {
        tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
      }
      match self.client.get_by_name(kind, parent_id, lookup_value).await
      {
        Ok(Some(resource)) => return Ok(resource.id),
        Ok(None) => {
          last_err = None;
        }
        Err(err) => last_err = Some(err),
      }
    }
    match last_err {
      Some(source) => Err(ExecutorError::Resolution {
        r#ref: lookup_value.to_string(),
        lookup_value: lookup_value.to_string(),
        source,
      }),
      None => Err(ExecutorError::ResolutionNotFound {
        r#ref: lookup_value.to_string(),
        lookup_value: lookup_value.to_string(),
      }),
    }
  }

  /// Resolves a slug path (`"a/b/c"`) against a lazily-built hierarchy
  /// cache of the parent's children, used for portal pages and API
  /// documents.
  async fn resolve_via_hierarchy(
    &self,
    kind: ResourceKind,
    parent_id: &str,
    parent_field: &str,
    slug_path: &str,
  ) -> Result<String, ExecutorError> {
    let hierarchy = match self.state.get_hierarchy(kind, parent_id).await
    {
      Some(h) => h,
      None => {
        let items = self.client.list_all(kind, Some(parent_id)).await?;
        let built = Hierarchy::build(&items, parent_field);
        self
          .state
          .cache_hierarchy(kind, parent_id, built.clone())
          .await;
        std::sync::Arc::new(built)
      }
    };

    hierarchy.resolve_path(slug_path).ok_or_else(|| {
      ExecutorError::ResolutionNotFound {
        r#ref: slug_path.to_string(),
        lookup_value: slug_path.to_string(),
      }
    })
  }

  /// Resolves an array reference (e.g. `auth_strategy_ids`, group
  /// members): every entry independently, index-aligned with
  /// `LookupArrays`. Any single unresolved entry fails the whole field.
  pub async fn resolve_array(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
    field: &str,
    info: &ReferenceInfo,
  ) -> Result<Vec<String>, ExecutorError> {
    let mut out = Vec::with_capacity(info.refs.len());
    for (i, r#ref) in info.refs.iter().enumerate() {
      if let Some(Some(id)) = info.resolved_ids.get(i)
        && !is_unresolved(id)
      {
        out.push(id.clone());
        continue;
      }

      let parsed = parse_reference(r#ref);
      let r#ref = match parsed {
        ParsedReference::Direct(id)
          if !is_unresolved(&id) =>
        {
          out.push(id);
          continue;
        }
        ParsedReference::Direct(r#ref) => r#ref,
        ParsedReference::Placeholder { r#ref, .. } => r#ref,
      };

      if let Some(id) = self.state.lookup_ref(kind, &r#ref).await {
        out.push(id);
        continue;
      }

      let lookup_value = info
        .lookup_arrays
        .get("name")
        .and_then(|names| names.get(i))
        .map(String::as_str)
        .unwrap_or(r#ref.as_str());

      let id = self
        .resolve_by_name_with_retry(kind, parent_id, lookup_value)
        .await
        .map_err(|_| ExecutorError::ArrayResolution {
          field: field.to_string(),
        })?;
      self.state.cache_ref(kind, &r#ref, &id).await;
      out.push(id);
    }
    Ok(out)
  }
}
