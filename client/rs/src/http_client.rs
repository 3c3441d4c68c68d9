use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;

use crate::{
  client::StateClient,
  entities::{RemoteResource, ResourceKind},
  error::ClientError,
};

/// Default `StateClient` hitting the platform's REST API directly over
/// `reqwest`. Pagination, by-name filtering and the `managed=true`
/// restriction all live here so every adapter gets them for free.
pub struct HttpStateClient {
  http: reqwest::Client,
  base_url: String,
  token: String,
}

impl HttpStateClient {
  pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
    Self {
      http: reqwest::Client::new(),
      base_url: base_url.into().trim_end_matches('/').to_string(),
      token: token.into(),
    }
  }

  fn collection_url(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
  ) -> String {
    match (kind.parent_kind(), parent_id) {
      (Some(parent_kind), Some(parent_id)) => format!(
        "{}/{}/{parent_id}/{}",
        self.base_url,
        parent_kind.path_segment(),
        kind.path_segment(),
      ),
      _ => format!("{}/{}", self.base_url, kind.path_segment()),
    }
  }

  fn item_url(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
    id: &str,
  ) -> String {
    if kind.is_singleton() {
      self.collection_url(kind, parent_id)
    } else {
      format!("{}/{id}", self.collection_url(kind, parent_id))
    }
  }

  async fn send(
    &self,
    kind: ResourceKind,
    operation: &str,
    method: Method,
    url: String,
    body: Option<serde_json::Value>,
  ) -> Result<reqwest::Response, ClientError> {
    let mut req = self
      .http
      .request(method, &url)
      .bearer_auth(&self.token);
    if let Some(body) = body {
      req = req.json(&body);
    }
    let resp =
      req.send().await.map_err(|source| ClientError::Transport {
        resource_type: kind.as_tag().to_string(),
        source,
      })?;
    if !resp.status().is_success() {
      let status = resp.status();
      let body = resp.text().await.unwrap_or_default();
      return Err(ClientError::Api {
        resource_type: kind.as_tag().to_string(),
        operation: operation.to_string(),
        status,
        body,
      });
    }
    Ok(resp)
  }

  async fn decode<T: for<'de> Deserialize<'de>>(
    &self,
    kind: ResourceKind,
    resp: reqwest::Response,
  ) -> Result<T, ClientError> {
    let bytes =
      resp.bytes().await.map_err(|source| ClientError::Transport {
        resource_type: kind.as_tag().to_string(),
        source,
      })?;
    serde_json::from_slice(&bytes).map_err(|source| {
      ClientError::Decode {
        resource_type: kind.as_tag().to_string(),
        source,
      }
    })
  }
}

#[derive(Deserialize)]
struct ListPage {
  #[serde(default)]
  data: Vec<RemoteResource>,
  #[serde(default)]
  offset: Option<String>,
}

#[async_trait]
impl StateClient for HttpStateClient {
  async fn create(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
    body: serde_json::Value,
  ) -> Result<RemoteResource, ClientError> {
    let url = self.collection_url(kind, parent_id);
    let resp = self
      .send(kind, "create", Method::POST, url, Some(body))
      .await?;
    self.decode(kind, resp).await
  }

  async fn update(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
    id: &str,
    body: serde_json::Value,
  ) -> Result<RemoteResource, ClientError> {
    let url = self.item_url(kind, parent_id, id);
    let resp = self
      .send(kind, "update", Method::PATCH, url, Some(body))
      .await?;
    self.decode(kind, resp).await
  }

  async fn delete(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
    id: &str,
  ) -> Result<(), ClientError> {
    let url = self.item_url(kind, parent_id, id);
    let req = self.http.request(Method::DELETE, &url).bearer_auth(&self.token);
    let resp =
      req.send().await.map_err(|source| ClientError::Transport {
        resource_type: kind.as_tag().to_string(),
        source,
      })?;
    // Deleting something already gone is success, not an error.
    if resp.status() == StatusCode::NOT_FOUND || resp.status().is_success() {
      return Ok(());
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Api {
      resource_type: kind.as_tag().to_string(),
      operation: "delete".to_string(),
      status,
      body,
    })
  }

  async fn get_by_id(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
    id: &str,
  ) -> Result<Option<RemoteResource>, ClientError> {
    let url = self.item_url(kind, parent_id, id);
    let req = self.http.get(&url).bearer_auth(&self.token);
    let resp =
      req.send().await.map_err(|source| ClientError::Transport {
        resource_type: kind.as_tag().to_string(),
        source,
      })?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    if !resp.status().is_success() {
      let status = resp.status();
      let body = resp.text().await.unwrap_or_default();
      return Err(ClientError::Api {
        resource_type: kind.as_tag().to_string(),
        operation: "get_by_id".to_string(),
        status,
        body,
      });
    }
    Ok(Some(self.decode(kind, resp).await?))
  }

  async fn get_by_name(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
    name: &str,
  ) -> Result<Option<RemoteResource>, ClientError> {
    let url = self.collection_url(kind, parent_id);
    let req = self
      .http
      .get(&url)
      .query(&[("filter[name][eq]", name)])
      .bearer_auth(&self.token);
    let resp =
      req.send().await.map_err(|source| ClientError::Transport {
        resource_type: kind.as_tag().to_string(),
        source,
      })?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    if !resp.status().is_success() {
      let status = resp.status();
      let body = resp.text().await.unwrap_or_default();
      return Err(ClientError::Api {
        resource_type: kind.as_tag().to_string(),
        operation: "get_by_name".to_string(),
        status,
        body,
      });
    }
    let page: ListPage = self.decode(kind, resp).await?;
    Ok(page.data.into_iter().find(|r| r.name == name))
  }

  async fn list_all(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
  ) -> Result<Vec<RemoteResource>, ClientError> {
    let mut out = Vec::new();
    let mut offset: Option<String> = None;
    loop {
      let base = self.collection_url(kind, parent_id);
      let url = match &offset {
        Some(o) => format!("{base}?offset={o}"),
        None => base,
      };
      let req = self.http.get(&url).bearer_auth(&self.token);
      let resp =
        req.send().await.map_err(|source| ClientError::Transport {
          resource_type: kind.as_tag().to_string(),
          source,
        })?;
      if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api {
          resource_type: kind.as_tag().to_string(),
          operation: "list".to_string(),
          status,
          body,
        });
      }
      let page: ListPage = self.decode(kind, resp).await?;
      out.extend(page.data);
      match page.offset {
        Some(next) if !next.is_empty() => offset = Some(next),
        _ => break,
      }
    }
    Ok(out)
  }

  async fn list_managed(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
  ) -> Result<Vec<RemoteResource>, ClientError> {
    Ok(
      self
        .list_all(kind, parent_id)
        .await?
        .into_iter()
        .filter(RemoteResource::is_managed)
        .collect(),
    )
  }

  async fn upsert_group_membership(
    &self,
    group_id: &str,
    member_ids: Vec<String>,
  ) -> Result<(), ClientError> {
    let url = format!(
      "{}/control-planes/{group_id}/members",
      self.base_url
    );
    let req = self
      .http
      .put(&url)
      .bearer_auth(&self.token)
      .json(&serde_json::json!({ "members": member_ids }));
    let resp =
      req.send().await.map_err(|source| ClientError::Transport {
        resource_type: ResourceKind::ControlPlane.as_tag().to_string(),
        source,
      })?;
    if !resp.status().is_success() {
      let status = resp.status();
      let body = resp.text().await.unwrap_or_default();
      return Err(ClientError::Api {
        resource_type: ResourceKind::ControlPlane.as_tag().to_string(),
        operation: "upsert_group_membership".to_string(),
        status,
        body,
      });
    }
    Ok(())
  }

  async fn list_gateway_services(
    &self,
    control_plane_id: &str,
  ) -> Result<Vec<RemoteResource>, ClientError> {
    self
      .list_all(ResourceKind::GatewayService, Some(control_plane_id))
      .await
  }
}
