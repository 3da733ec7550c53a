//! HTTP surface
//!
//! - `GET /uuid/{module}/node/{uuid}` and `/uuid/node/{uuid}` return the node id as plain text
//! - `GET /uuid/{module}/relationship/{uuid}` and `/uuid/relationship/{uuid}` do the same for relationships
//! - `GET /db/node/{id}` and `/db/relationship/{id}` return the entity as JSON
//! - `GET /api/status` reports store and index sizes

pub mod handler;
pub mod server;

pub use handler::{ApiError, AppState};
pub use server::{router, HttpServer};
