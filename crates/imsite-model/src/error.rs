//! Error types for site configuration

use crate::types::ProjectId;
use std::path::PathBuf;

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for [`SiteConfig`](crate::SiteConfig)
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// Allow-list names the same project twice
    #[error("project {0} listed more than once in the allow-list")]
    DuplicateProject(ProjectId),

    /// A lookup table has an empty key
    #[error("empty key in [{table}]")]
    EmptyKey { table: &'static str },

    /// An icon prefix names no known icon category
    #[error("unknown icon {value:?} for prefix {prefix}")]
    UnknownIcon { prefix: String, value: String },

    /// A route override maps to an empty path
    #[error("route override for {instrument} is empty")]
    EmptyRoute { instrument: String },
}
