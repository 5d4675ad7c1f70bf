//! HTTP API.
//!
//! Exposes upload, listing, search, question answering and maintenance
//! over axum. Handlers share an `ApiContext` holding the processor, the
//! registry connection and the remote-service clients.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::serve;
pub use types::ApiContext;
