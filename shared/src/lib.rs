//! Shared types for the storefront backend
//!
//! Wire-level types used by the server and its clients: API response
//! envelope, request/response DTOs and the catalog/invoice models.

pub mod client;
pub mod models;
pub mod response;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use response::ApiResponse;
