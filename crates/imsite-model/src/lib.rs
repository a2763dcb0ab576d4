//! imSite Model
//!
//! Domain records and static configuration shared by the navigation core.
//!
//! # Core Concepts
//!
//! - [`Principal`]: the acting user, with an administrator flag and feature flags
//! - [`Project`] / [`ProjectId`]: projects from the backing store
//! - [`Instrument`]: a sensor owned by exactly one project
//! - [`Membership`]: a user-to-project visibility grant
//! - [`RouteClassification`]: derived route and icon for an instrument
//! - [`SiteConfig`]: allow-list, route overrides and icon prefixes
//!
//! # Example
//!
//! ```rust,ignore
//! use imsite_model::{SiteConfig, Principal};
//!
//! let config = SiteConfig::load("imsite.toml")?;
//! let principal = Principal::user("field@dgmts.com");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod classification;
pub mod config;
pub mod error;
pub mod types;

pub use classification::{IconCategory, Route, RouteClassification};
pub use config::SiteConfig;
pub use error::ConfigError;
pub use types::{Instrument, Membership, PermissionFlags, Principal, Project, ProjectId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
