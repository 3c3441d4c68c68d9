use std::sync::Arc;

use cache::CloneCache;
use kongctl_client::entities::{RemoteResource, ResourceKind};

/// One node of a cached parent/child hierarchy (API documents, portal
/// pages), as built from a full listing of a parent's children.
#[derive(Debug, Clone)]
pub struct HierarchyNode {
  pub id: String,
  pub slug: String,
  pub children: Vec<HierarchyNode>,
}

/// A hierarchy rooted at a given parent, with a slug-path search:
/// `"a/b/c"` finds the root node with slug `a`, recurses into its child
/// `b`, then `c`.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
  pub roots: Vec<HierarchyNode>,
}

impl Hierarchy {
  /// Builds a hierarchy from a flat listing, linking children to
  /// parents via `parent_field` (e.g. `parent_document_id`).
  pub fn build(items: &[RemoteResource], parent_field: &str) -> Self {
    #[derive(Clone)]
    struct Flat {
      id: String,
      slug: String,
      parent: Option<String>,
    }

    let flat: Vec<Flat> = items
      .iter()
      .map(|item| Flat {
        id: item.id.clone(),
        slug: item
          .raw_str("slug")
          .or_else(|| item.raw_str("slug_path"))
          .unwrap_or(item.name.as_str())
          .to_string(),
        parent: item.raw_str(parent_field).map(str::to_string),
      })
      .collect();

    fn build_children(
      flat: &[Flat],
      parent_id: Option<&str>,
    ) -> Vec<HierarchyNode> {
      flat
        .iter()
        .filter(|f| f.parent.as_deref() == parent_id)
        .map(|f| HierarchyNode {
          id: f.id.clone(),
          slug: f.slug.clone(),
          children: build_children(flat, Some(f.id.as_str())),
        })
        .collect()
    }

    Self {
      roots: build_children(&flat, None),
    }
  }

  /// Resolves a slash-separated slug path to a concrete id.
  pub fn resolve_path(&self, path: &str) -> Option<String> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let first = segments.next()?;
    let mut nodes = &self.roots;
    let mut found: Option<&HierarchyNode> = None;
    for segment in std::iter::once(first).chain(segments) {
      let node = nodes.iter().find(|n| n.slug == segment)?;
      found = Some(node);
      nodes = &node.children;
    }
    found.map(|n| n.id.clone())
  }
}

/// Process-local state owned exclusively by one `Executor` instance.
/// Because the executor runs sequentially, none of this needs locking
/// for correctness; `CloneCache` is used anyway since it is already the
/// codebase's standard async-friendly cache primitive.
#[derive(Default)]
pub struct ExecutorState {
  /// `refToID[(kind, ref)] = id`, populated on every successful CREATE.
  ref_to_id: CloneCache<(ResourceKind, String), String>,
  /// `createdResources[changeID] = id`.
  created_resources: CloneCache<String, String>,
  /// Cached parent/child hierarchies, keyed by `(kind, parent_id)`.
  /// Dropped wholesale for a parent on any mutation within it, per the
  /// simple invalidation design: a stale subtree is worse than a cache
  /// miss.
  hierarchies: CloneCache<(ResourceKind, String), Arc<Hierarchy>>,
}

impl ExecutorState {
  pub async fn record_created(
    &self,
    kind: ResourceKind,
    r#ref: &str,
    change_id: &str,
    id: &str,
  ) {
    self.cache_ref(kind, r#ref, id).await;
    self
      .created_resources
      .insert(change_id.to_string(), id.to_string())
      .await;
  }

  /// Caches a ref→id mapping without recording a `createdResources`
  /// entry, for references resolved by lookup rather than by CREATE.
  pub async fn cache_ref(
    &self,
    kind: ResourceKind,
    r#ref: &str,
    id: &str,
  ) {
    self
      .ref_to_id
      .insert((kind, r#ref.to_string()), id.to_string())
      .await;
  }

  pub async fn lookup_ref(
    &self,
    kind: ResourceKind,
    r#ref: &str,
  ) -> Option<String> {
    self.ref_to_id.get(&(kind, r#ref.to_string())).await
  }

  pub async fn cache_hierarchy(
    &self,
    kind: ResourceKind,
    parent_id: &str,
    hierarchy: Hierarchy,
  ) {
    self
      .hierarchies
      .insert((kind, parent_id.to_string()), Arc::new(hierarchy))
      .await;
  }

  pub async fn get_hierarchy(
    &self,
    kind: ResourceKind,
    parent_id: &str,
  ) -> Option<Arc<Hierarchy>> {
    self.hierarchies.get(&(kind, parent_id.to_string())).await
  }

  pub async fn invalidate_hierarchy(
    &self,
    kind: ResourceKind,
    parent_id: &str,
  ) {
    self
      .hierarchies
      .remove(&(kind, parent_id.to_string()))
      .await;
  }
}
