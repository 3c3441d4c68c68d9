use serde::{Deserialize, Serialize};

use crate::error::ExecutorError;

/// `application_auth_strategy`'s `strategy_type` discriminated union.
/// Unknown kinds fail closed rather than passing an unrecognised shape
/// through to the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy_type", rename_all = "snake_case")]
pub enum AuthStrategyConfig {
  KeyAuth {
    configs: KeyAuthConfigs,
  },
  OpenidConnect {
    configs: OpenIdConnectConfigs,
  },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyAuthConfigs {
  pub key_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenIdConnectConfigs {
  pub issuer: String,
  #[serde(default = "default_credential_claim")]
  pub credential_claim: Vec<String>,
  #[serde(default)]
  pub scopes: Option<Vec<String>>,
  #[serde(default)]
  pub auth_methods: Option<Vec<String>>,
}

fn default_credential_claim() -> Vec<String> {
  vec!["sub".to_string()]
}

/// Validates (and normalizes defaults for) an auth strategy's fields
/// map before it is sent to the platform. Fails closed on an unknown
/// `strategy_type` rather than forwarding it verbatim.
pub fn validate(
  fields: &serde_json::Map<String, serde_json::Value>,
) -> Result<AuthStrategyConfig, ExecutorError> {
  let value = serde_json::Value::Object(fields.clone());
  serde_json::from_value(value).map_err(|e| {
    ExecutorError::Other(anyhow::anyhow!(
      "unsupported or malformed application_auth_strategy config: {e}"
    ))
  })
}
