//! HTTP handlers.

mod error;
mod health;
mod identify;
mod index;

pub use error::ApiError;
pub use health::health_routes;
pub use identify::{identify, IdentifyRequest, IdentifyResponse};
pub use index::service_description;
