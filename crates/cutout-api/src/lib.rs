//! Cutout API Library
//!
//! HTTP relay for background removal: routes, handlers, the relay service, and
//! application setup.

pub mod constants;
pub mod error;
mod handlers;
pub mod middleware;
pub mod services;
pub mod setup;
pub mod state;
mod utils;

pub use error::HttpAppError;
pub use services::RelayService;
pub use state::AppState;
