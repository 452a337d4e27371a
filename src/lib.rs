//! Pointbook - loyalty points ledger core.
//!
//! Awards tier-multiplied points for financial transactions and spends them
//! on catalog rewards, against a durable append-only ledger whose running
//! balance always reconciles, under concurrent requests for the same user
//! and client retries of the same request.

pub mod audit;
pub mod config;
pub mod error;
pub mod idempotency;
pub mod interfaces;
pub mod model;
pub mod service;
pub mod storage;
pub mod tier;

pub use config::Config;
pub use error::{PointsError, Result};
pub use service::PointsService;
