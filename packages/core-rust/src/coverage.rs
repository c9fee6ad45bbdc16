//! Coverage verification: detects vendor actions the registry does not
//! classify, typically after a vendor API upgrade.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

use crate::action::{CLIENT_PLUMBING, WRAPPER_PLUMBING};
use crate::registry::OperationRegistry;

/// Names excluded from verification.
///
/// Owned by the caller and passed explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageConfig {
    pub ignored: BTreeSet<String>,
}

impl Default for CoverageConfig {
    /// Ignores connection lifecycle, handshake and message-loop plumbing.
    fn default() -> Self {
        Self {
            ignored: CLIENT_PLUMBING
                .iter()
                .chain(WRAPPER_PLUMBING)
                .map(|name| (*name).to_string())
                .collect(),
        }
    }
}

impl CoverageConfig {
    /// A config that ignores nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ignored: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn ignore(mut self, name: impl Into<String>) -> Self {
        self.ignored.insert(name.into());
        self
    }
}

/// Outcome of [`verify_coverage`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    /// Exposed names that are neither classified nor ignored. Sorted.
    pub unclassified: Vec<String>,
    /// Classified names the exposed list does not contain. Sorted.
    pub unexposed: Vec<String>,
}

impl CoverageReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unclassified.is_empty()
    }
}

/// Computes `exposed - (classified + ignored)`, plus the reverse difference.
///
/// Gaps are warnings: each one is logged and returned, never raised.
pub fn verify_coverage<I, S>(
    registry: &OperationRegistry,
    exposed: I,
    config: &CoverageConfig,
) -> CoverageReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let exposed: BTreeSet<String> = exposed
        .into_iter()
        .map(|name| name.as_ref().to_string())
        .collect();
    let classified: BTreeSet<&'static str> = registry
        .classified_actions()
        .into_iter()
        .map(|action| action.as_str())
        .collect();

    let unclassified: Vec<String> = exposed
        .iter()
        .filter(|name| !classified.contains(name.as_str()) && !config.ignored.contains(*name))
        .cloned()
        .collect();
    let unexposed: Vec<String> = classified
        .iter()
        .filter(|name| !exposed.contains(**name))
        .map(|name| (*name).to_string())
        .collect();

    for name in &unclassified {
        warn!(action = %name, "vendor action is not classified by any descriptor");
    }
    for name in &unexposed {
        warn!(action = %name, "classified action is not exposed by the vendor");
    }

    CoverageReport {
        unclassified,
        unexposed,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::action::vendor_surface;

    #[test]
    fn builtin_registry_covers_vendor_surface() {
        let registry = OperationRegistry::builtin().unwrap();
        let report = verify_coverage(&registry, vendor_surface(), &CoverageConfig::default());
        assert!(report.is_complete(), "unclassified: {:?}", report.unclassified);
        assert!(report.unexposed.is_empty(), "unexposed: {:?}", report.unexposed);
    }

    #[test]
    fn newer_vendor_actions_are_reported_sorted() {
        let registry = OperationRegistry::builtin().unwrap();
        let mut exposed = vendor_surface();
        exposed.push("reqWshMetaData");
        exposed.push("replaceFAEnd");
        exposed.push("replaceFAEnd");

        let report = verify_coverage(&registry, exposed, &CoverageConfig::default());
        assert!(!report.is_complete());
        assert_eq!(report.unclassified, vec!["replaceFAEnd", "reqWshMetaData"]);
    }

    #[test]
    fn ignored_names_are_not_reported() {
        let registry = OperationRegistry::builtin().unwrap();
        let config = CoverageConfig::default().ignore("reqWshMetaData");
        let mut exposed = vendor_surface();
        exposed.push("reqWshMetaData");

        let report = verify_coverage(&registry, exposed, &config);
        assert!(report.is_complete());
    }

    #[test]
    fn empty_config_reports_plumbing() {
        let registry = OperationRegistry::builtin().unwrap();
        let report = verify_coverage(&registry, ["connect", "reqMktData"], &CoverageConfig::empty());
        assert_eq!(report.unclassified, vec!["connect"]);
        // Everything but reqMktData is classified yet missing from the list.
        assert!(report.unexposed.contains(&"reqPositions".to_string()));
        assert!(!report.unexposed.contains(&"reqMktData".to_string()));
    }

    #[test]
    fn removed_vendor_action_is_unexposed() {
        let registry = OperationRegistry::builtin().unwrap();
        let exposed: Vec<_> = vendor_surface()
            .into_iter()
            .filter(|name| *name != "reqSoftDollarTiers")
            .collect();
        let report = verify_coverage(&registry, exposed, &CoverageConfig::default());
        assert!(report.is_complete());
        assert_eq!(report.unexposed, vec!["reqSoftDollarTiers"]);
    }

    proptest! {
        #[test]
        fn classified_plus_ignored_superset_is_complete(
            extra in proptest::collection::vec("[a-z]{3,12}", 0..16),
        ) {
            let registry = OperationRegistry::builtin().unwrap();
            let mut config = CoverageConfig::default();
            for name in &extra {
                config.ignored.insert(name.clone());
            }

            let exposed: Vec<String> = registry
                .classified_actions()
                .into_iter()
                .map(|action| action.as_str().to_string())
                .chain(config.ignored.iter().cloned())
                .collect();

            let report = verify_coverage(&registry, exposed, &config);
            prop_assert!(report.unclassified.is_empty());
            prop_assert!(report.unexposed.is_empty());
        }
    }
}
