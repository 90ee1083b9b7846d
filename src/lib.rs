//! In-memory room reservations served over the PostgreSQL wire protocol.
//!
//! [`engine::Engine`] is the core: per-room collision checks under per-room
//! locks, plus a best-effort search for a free room. Everything else adapts it
//! to SQL clients.

pub mod auth;
pub mod engine;
pub mod model;
pub mod observability;
pub mod sql;
pub mod tls;
pub mod wire;
