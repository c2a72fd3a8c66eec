//! Typed query helpers over the store.

pub mod analyses;
pub mod sessions;
pub mod users;
