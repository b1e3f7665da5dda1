//! Workback GitHub gateway
//!
//! [`GitHubGateway`] implements [`workback_core::TrackerGateway`] against
//! GitHub Issues (REST) and Projects v2 (GraphQL). Wrap it in
//! [`workback_core::RetryingGateway`] for rate-limit and 5xx retries.

mod client;
mod config;
pub mod graphql;

pub use client::GitHubGateway;
pub use config::GitHubConfig;
