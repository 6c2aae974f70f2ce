//! Axum HTTP surface for the chat router: the AG-UI chat endpoint, health
//! probes, and the admin reload endpoint.

mod admin;
mod app;
mod chat;
mod error;

pub use app::{router, AppState};
pub use error::ApiError;
