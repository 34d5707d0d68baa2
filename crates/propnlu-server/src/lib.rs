//! HTTP surface: configuration, shared model state, routes, and error mapping.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use routes::build_router;
pub use state::{AppState, ModelState};
