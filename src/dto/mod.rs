//! Wire-facing request and response shapes.

pub mod health;
pub mod sessions;
pub mod sse;
pub mod validation;
