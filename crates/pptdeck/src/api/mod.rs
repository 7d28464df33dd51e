//! Client for the presentation backend's REST API.

pub mod auth;
pub mod client;
pub mod error;
pub mod ppts;

pub use auth::AuthApi;
pub use client::ApiClient;
pub use error::ApiError;
pub use ppts::PptsApi;
