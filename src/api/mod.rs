//! API Module
//!
//! HTTP handlers and routing for the order lookup API.
//!
//! # Endpoints
//! - `GET /orders` - Look up an order (raw id in the body)
//! - `GET /orders/:id` - Look up an order by path
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Store connection health

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
