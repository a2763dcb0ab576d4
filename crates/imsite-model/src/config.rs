//! Static site configuration
//!
//! Three immutable lookup structures supplied at startup:
//! - the ordered project allow-list the sidebar is scoped to
//! - exact instrument identifier to route overrides
//! - identifier prefix to icon category table
//!
//! Both tables are [`IndexMap`]s: declaration order is scan order, and the
//! classifier depends on it.

use crate::classification::IconCategory;
use crate::error::ConfigError;
use crate::types::ProjectId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Navigation configuration
///
/// Tables missing from a config file are empty, not the shipped defaults.
/// Icon names in a file must be known categories; `default` is spelled out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSiteConfig")]
pub struct SiteConfig {
    /// Projects shown in the sidebar, in display order
    pub project_allow_list: Vec<ProjectId>,
    /// Exact identifier to route path
    pub route_overrides: IndexMap<String, String>,
    /// Identifier prefix to icon category, scanned in order
    pub icon_prefixes: IndexMap<String, IconCategory>,
}

/// File layout before icon names are checked
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSiteConfig {
    #[serde(default, alias = "sidebar_project_ids")]
    project_allow_list: Vec<ProjectId>,
    #[serde(default)]
    route_overrides: IndexMap<String, String>,
    #[serde(default)]
    icon_prefixes: IndexMap<String, String>,
}

impl TryFrom<RawSiteConfig> for SiteConfig {
    type Error = ConfigError;

    fn try_from(raw: RawSiteConfig) -> Result<Self, Self::Error> {
        let icon_prefixes = raw
            .icon_prefixes
            .into_iter()
            .map(|(prefix, value)| match IconCategory::from_known(&value) {
                Some(icon) => Ok((prefix, icon)),
                None => Err(ConfigError::UnknownIcon { prefix, value }),
            })
            .collect::<Result<IndexMap<_, _>, _>>()?;

        Ok(Self {
            project_allow_list: raw.project_allow_list,
            route_overrides: raw.route_overrides,
            icon_prefixes,
        })
    }
}

impl SiteConfig {
    /// Shipped dashboard configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration with no tables and an empty allow-list
    #[must_use]
    pub fn empty() -> Self {
        Self {
            project_allow_list: Vec::new(),
            route_overrides: IndexMap::new(),
            icon_prefixes: IndexMap::new(),
        }
    }

    /// With allow-list
    #[inline]
    #[must_use]
    pub fn with_allow_list<I, P>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ProjectId>,
    {
        self.project_allow_list = ids.into_iter().map(Into::into).collect();
        self
    }

    /// With an additional route override (appended after existing ones)
    #[inline]
    #[must_use]
    pub fn with_route(mut self, instrument_id: impl Into<String>, route: impl Into<String>) -> Self {
        self.route_overrides.insert(instrument_id.into(), route.into());
        self
    }

    /// With an additional icon prefix (appended after existing ones)
    #[inline]
    #[must_use]
    pub fn with_icon_prefix(mut self, prefix: impl Into<String>, icon: IconCategory) -> Self {
        self.icon_prefixes.insert(prefix.into(), icon);
        self
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError`] on malformed TOML or an invalid table.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawSiteConfig = toml::from_str(text)?;
        let config = Self::try_from(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`SiteConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check table invariants
    ///
    /// # Errors
    /// - [`ConfigError::DuplicateProject`] if the allow-list repeats an id
    /// - [`ConfigError::EmptyKey`] if a table key is blank
    /// - [`ConfigError::EmptyRoute`] if an override maps to a blank path
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::with_capacity(self.project_allow_list.len());
        for id in &self.project_allow_list {
            if !seen.insert(*id) {
                return Err(ConfigError::DuplicateProject(*id));
            }
        }

        for (instrument, route) in &self.route_overrides {
            if instrument.is_empty() {
                return Err(ConfigError::EmptyKey {
                    table: "route_overrides",
                });
            }
            if route.trim().is_empty() {
                return Err(ConfigError::EmptyRoute {
                    instrument: instrument.clone(),
                });
            }
        }

        if self.icon_prefixes.keys().any(String::is_empty) {
            return Err(ConfigError::EmptyKey {
                table: "icon_prefixes",
            });
        }

        Ok(())
    }

    /// Whether `id` is in the allow-list
    #[inline]
    #[must_use]
    pub fn allows(&self, id: ProjectId) -> bool {
        self.project_allow_list.contains(&id)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::empty()
            .with_allow_list([24637, 20151, 24429])
            .with_route("SMG1", "/background")
            .with_route("SMG-2", "/anc-seismograph")
            .with_route("SMG-3", "/smg3-seismograph")
            .with_route("AMTS-1", "/single-prism-with-time")
            .with_route("AMTS-2", "/multi-prisms-with-time")
            .with_route("TILT-142939", "/tiltmeter-142939")
            .with_route("TILT-143969", "/tiltmeter-143969")
            .with_icon_prefix("SMG", IconCategory::Seismograph)
            .with_icon_prefix("TILT", IconCategory::Tiltmeter)
            .with_icon_prefix("AMTS", IconCategory::Prism)
    }
}
