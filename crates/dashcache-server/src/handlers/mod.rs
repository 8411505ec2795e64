//! HTTP handlers for the ops surface.

pub mod health;
pub mod metrics;
