pub mod adapter;
pub mod auth_strategy;
pub mod cache_state;
pub mod control_plane;
pub mod error;
pub mod executor;
pub mod external_tool;
pub mod label;
pub mod reporter;
pub mod resolver;
pub mod result;
pub mod validation;

pub use error::ExecutorError;
pub use executor::Executor;
pub use external_tool::{DeckRunner, Runner, RunnerArgs, RunnerOutput};
pub use reporter::{LoggingReporter, Reporter};
pub use result::{
  ChangeApplied, ChangeError, ExecutionResult, Validation,
  ValidationResult, ValidationStatus,
};
