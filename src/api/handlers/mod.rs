//! API request handlers.

/// `POST /ask`.
pub mod ask;
/// `GET /health`.
pub mod health;
