//! Domain and transport models
//!
//! The order record plus the DTOs used for HTTP request and response bodies.

pub mod order;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use order::{Order, ORDER_COLUMNS};
pub use requests::OrderLookup;
pub use responses::{HealthResponse, StatsResponse};
