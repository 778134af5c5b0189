//! Configuration module for title extraction
//!
//! This module provides the `ScrapeConfig` struct, its builder, and the
//! `SiteProfile` describing where fields live on the target site.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod site;
pub mod types;

// Re-exports for public API
pub use builder::ScrapeConfigBuilder;
pub use site::SiteProfile;
pub use types::ScrapeConfig;
