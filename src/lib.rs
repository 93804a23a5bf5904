//! Users and spendings API guarded by per-client admission control.
//!
//! Every request passes [`middleware::admission`], which keeps one token
//! bucket per client address in a [`rate_limit::Registry`]. The
//! [`sweeper`] task drops clients that have gone idle.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod security;
pub mod state;
pub mod store;
pub mod sweeper;
