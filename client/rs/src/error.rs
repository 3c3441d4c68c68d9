use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("{resource_type} request failed: {source}")]
  Transport {
    resource_type: String,
    #[source]
    source: reqwest::Error,
  },
  #[error("{resource_type} {operation} failed with status {status}: {body}")]
  Api {
    resource_type: String,
    operation: String,
    status: reqwest::StatusCode,
    body: String,
  },
  #[error("failed to decode {resource_type} response: {source}")]
  Decode {
    resource_type: String,
    #[source]
    source: serde_json::Error,
  },
}
