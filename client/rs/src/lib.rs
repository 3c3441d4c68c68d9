pub mod client;
pub mod entities;
pub mod error;
pub mod http_client;

pub use client::StateClient;
pub use error::ClientError;
pub use http_client::HttpStateClient;
