//! MaculaCutis Core Library
//!
//! Image intake, delegation to the hosted classifier and heatmap renderer,
//! analysis orchestration, and user accounts.

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod credentials;
pub mod error;
pub mod heatmap;
pub mod intake;
pub mod user;

pub use error::{MaculaError, MaculaResult};
