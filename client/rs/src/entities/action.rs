use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
  Create,
  Update,
  Delete,
  ExternalTool,
}
