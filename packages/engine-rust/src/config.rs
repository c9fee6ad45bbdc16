//! Engine configuration.

use std::collections::BTreeSet;

/// Dispatcher-level configuration.
///
/// Override individual fields with struct-literal syntax:
/// `EngineConfig { first_request_id: 1000, ..EngineConfig::default() }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// First identifier handed to identifier-correlated requests.
    pub first_request_id: i64,
    /// Vendor codes that, when carried by an error without an identifier,
    /// are notices rather than failures. Such errors are logged only;
    /// addressed errors always reach their operation. Empty by default:
    /// which codes are notices is the caller's call.
    pub informational_codes: BTreeSet<i32>,
    /// Capacity of the bounded channel between the transport reader and
    /// the inbound pump. See [`Dispatcher::inbound_channel`].
    ///
    /// [`Dispatcher::inbound_channel`]: crate::dispatcher::Dispatcher::inbound_channel
    pub inbound_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            first_request_id: 1,
            informational_codes: BTreeSet::new(),
            inbound_channel_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.first_request_id, 1);
        assert!(config.informational_codes.is_empty());
        assert_eq!(config.inbound_channel_capacity, 1024);
    }

    #[test]
    fn struct_literal_override() {
        let config = EngineConfig {
            first_request_id: 5000,
            // Data farm connection notices sent after every connect.
            informational_codes: [2104, 2106, 2107, 2108, 2158].into_iter().collect(),
            ..EngineConfig::default()
        };
        assert_eq!(config.first_request_id, 5000);
        assert!(config.informational_codes.contains(&2104));
        assert_eq!(config.inbound_channel_capacity, 1024);
    }
}
