//! Engine configuration.
//!
//! Tunes the lookups the engine performs and how it waits on cooperative
//! completions.

use std::time::Duration;

/// Longest accepted wait between cooperative completion checks.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for an [`Engine`](crate::Engine).
///
/// # Fields
///
/// - `poll_interval` - wait between cooperative completion checks; `None`
///   yields to the scheduler once per check (default: `None`)
/// - `bare_name_lookup` - resolve namespace-less type names by scanning every
///   module (default: `true`)
/// - `path_lookup` - retry a missed host-object name as `/name` (default: `true`)
///
/// # Example
///
/// ```
/// use hostcall_engine::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig::new()
///     .with_poll_interval(Duration::from_millis(5))
///     .with_bare_name_lookup(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub poll_interval: Option<Duration>,
    pub bare_name_lookup: bool,
    pub path_lookup: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: None,
            bare_name_lookup: true,
            path_lookup: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn with_bare_name_lookup(mut self, enabled: bool) -> Self {
        self.bare_name_lookup = enabled;
        self
    }

    pub fn with_path_lookup(mut self, enabled: bool) -> Self {
        self.path_lookup = enabled;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the poll interval is zero
    /// - the poll interval is longer than one second
    pub fn validate(&self) -> Result<(), String> {
        let Some(interval) = self.poll_interval else {
            return Ok(());
        };

        if interval.is_zero() {
            return Err("poll interval must be greater than zero".to_string());
        }

        if interval > MAX_POLL_INTERVAL {
            return Err(format!(
                "poll interval must be <= 1 second (got {} ms)",
                interval.as_millis()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.poll_interval, None);
        assert!(config.bare_name_lookup);
        assert!(config.path_lookup);
        assert_eq!(config, EngineConfig::new());
    }

    #[test]
    fn test_builder_chaining() {
        let config = EngineConfig::new()
            .with_poll_interval(Duration::from_millis(16))
            .with_bare_name_lookup(false)
            .with_path_lookup(false);

        assert_eq!(config.poll_interval, Some(Duration::from_millis(16)));
        assert!(!config.bare_name_lookup);
        assert!(!config.path_lookup);
    }

    #[test]
    fn test_validate_default() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_interval_fails() {
        let err = EngineConfig::new()
            .with_poll_interval(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.contains("greater than zero"));
    }

    #[test]
    fn test_validate_long_interval_fails() {
        let err = EngineConfig::new()
            .with_poll_interval(Duration::from_millis(1500))
            .validate()
            .unwrap_err();
        assert!(err.contains("1 second"));
        assert!(err.contains("1500"));
    }

    #[test]
    fn test_validate_one_second_is_allowed() {
        let config = EngineConfig::new().with_poll_interval(Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }
}
