pub mod connection;
pub mod endpoints;
pub mod sse;

pub use connection::{ApiConnectionError, Provider};
