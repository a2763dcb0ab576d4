//! Derived navigation classification of an instrument
//!
//! A [`RouteClassification`] is never stored; it is recomputed from an
//! instrument's identifier and name on every resolution pass.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Icon category shown next to an instrument entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IconCategory {
    Seismograph,
    Tiltmeter,
    Prism,
    #[default]
    Default,
}

impl IconCategory {
    /// Canonical lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IconCategory::Seismograph => "seismograph",
            IconCategory::Tiltmeter => "tiltmeter",
            IconCategory::Prism => "prism",
            IconCategory::Default => "default",
        }
    }
}

impl IconCategory {
    /// Case-insensitive strict parse; `None` for unrecognised names
    ///
    /// `default` is the only spelling of [`IconCategory::Default`].
    #[must_use]
    pub fn from_known(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "seismograph" => Some(IconCategory::Seismograph),
            "tiltmeter" => Some(IconCategory::Tiltmeter),
            "prism" => Some(IconCategory::Prism),
            "default" => Some(IconCategory::Default),
            _ => None,
        }
    }
}

impl FromStr for IconCategory {
    type Err = std::convert::Infallible;

    /// Case-insensitive; anything unrecognised is [`IconCategory::Default`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_known(s).unwrap_or_default())
    }
}

impl From<String> for IconCategory {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(category) => category,
            Err(never) => match never {},
        }
    }
}

impl From<IconCategory> for String {
    fn from(value: IconCategory) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for IconCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Navigation route path
///
/// `#` marks an entry that is listed but not navigable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route(String);

impl Route {
    /// Sentinel path for unclassified instruments
    pub const UNCLASSIFIED: &'static str = "#";

    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The disabled sentinel route
    #[inline]
    #[must_use]
    pub fn unclassified() -> Self {
        Self(Self::UNCLASSIFIED.to_string())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the presentation layer should render this entry as clickable
    #[inline]
    #[must_use]
    pub fn is_navigable(&self) -> bool {
        self.0 != Self::UNCLASSIFIED
    }
}

impl From<&str> for Route {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl PartialEq<str> for Route {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Route {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Route and icon derived from `(identifier, name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteClassification {
    pub route: Route,
    pub icon: IconCategory,
}

impl RouteClassification {
    #[inline]
    #[must_use]
    pub fn new(route: Route, icon: IconCategory) -> Self {
        Self { route, icon }
    }

    /// Whether the entry is clickable
    #[inline]
    #[must_use]
    pub fn is_navigable(&self) -> bool {
        self.route.is_navigable()
    }
}
