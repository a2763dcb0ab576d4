//! Instrument classification
//!
//! Maps an instrument's `(identifier, name)` to a navigation route and an icon
//! category. Pure and total: every pair gets a classification.
//!
//! # Route resolution (first match wins)
//! 1. exact identifier in the configured route overrides
//! 2. `AMTS` identifier family: name contains `track`, then `ref`, else the
//!    single-prism page
//! 3. name keyword: `seismograph`, `tiltmeter`, `prism`
//! 4. `#` (listed, not navigable)
//!
//! # Icon resolution (independent of the route)
//! 1. first configured identifier prefix, in table order
//! 2. the same name keywords
//! 3. `default`

use imsite_model::{IconCategory, Route, RouteClassification, SiteConfig};
use std::sync::Arc;

/// Identifier prefix of the automated total station family
pub const AMTS_PREFIX: &str = "AMTS";

const AMTS_TRACK_ROUTE: &str = "/amts-track-graphs";
const AMTS_REF_ROUTE: &str = "/amts-ref-graphs";
const SINGLE_PRISM_ROUTE: &str = "/single-prism-with-time";

/// Name keywords in priority order, with their fallback route and icon
const NAME_KEYWORDS: [(&str, &str, IconCategory); 3] = [
    ("seismograph", "/background", IconCategory::Seismograph),
    ("tiltmeter", "/tiltmeter", IconCategory::Tiltmeter),
    ("prism", SINGLE_PRISM_ROUTE, IconCategory::Prism),
];

/// Classifier over the configured lookup tables
#[derive(Debug, Clone)]
pub struct InstrumentClassifier {
    config: Arc<SiteConfig>,
}

impl InstrumentClassifier {
    /// Create classifier over shared configuration
    #[inline]
    #[must_use]
    pub fn new(config: Arc<SiteConfig>) -> Self {
        Self { config }
    }

    /// Classify one instrument
    #[must_use]
    pub fn classify(&self, instrument_id: &str, instrument_name: &str) -> RouteClassification {
        let name = instrument_name.to_lowercase();
        let classification =
            RouteClassification::new(self.route(instrument_id, &name), self.icon(instrument_id, &name));
        tracing::debug!(
            instrument = instrument_id,
            route = %classification.route,
            icon = %classification.icon,
            "classified instrument"
        );
        classification
    }

    /// Route only
    #[inline]
    #[must_use]
    pub fn route_for(&self, instrument_id: &str, instrument_name: &str) -> Route {
        self.route(instrument_id, &instrument_name.to_lowercase())
    }

    /// Icon only
    #[inline]
    #[must_use]
    pub fn icon_for(&self, instrument_id: &str, instrument_name: &str) -> IconCategory {
        self.icon(instrument_id, &instrument_name.to_lowercase())
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    fn route(&self, instrument_id: &str, lowered_name: &str) -> Route {
        if let Some(route) = self.config.route_overrides.get(instrument_id) {
            return Route::new(route.as_str());
        }

        if instrument_id.starts_with(AMTS_PREFIX) {
            let route = if lowered_name.contains("track") {
                AMTS_TRACK_ROUTE
            } else if lowered_name.contains("ref") {
                AMTS_REF_ROUTE
            } else {
                SINGLE_PRISM_ROUTE
            };
            return Route::new(route);
        }

        NAME_KEYWORDS
            .iter()
            .find(|(keyword, _, _)| lowered_name.contains(keyword))
            .map_or_else(Route::unclassified, |(_, route, _)| Route::new(*route))
    }

    fn icon(&self, instrument_id: &str, lowered_name: &str) -> IconCategory {
        if let Some(icon) = self
            .config
            .icon_prefixes
            .iter()
            .find(|(prefix, _)| instrument_id.starts_with(prefix.as_str()))
            .map(|(_, icon)| *icon)
        {
            return icon;
        }

        NAME_KEYWORDS
            .iter()
            .find(|(keyword, _, _)| lowered_name.contains(keyword))
            .map_or(IconCategory::Default, |(_, _, icon)| *icon)
    }
}

impl Default for InstrumentClassifier {
    fn default() -> Self {
        Self::new(Arc::new(SiteConfig::default()))
    }
}
