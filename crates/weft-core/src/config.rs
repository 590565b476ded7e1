//! Application configuration.

use std::time::Duration;

use crate::application::Application;
use crate::display::Display;

/// Default window interval period (50 Hz).
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(20);

/// Default number of idle waits between reclaim hook runs.
pub const DEFAULT_RECLAIM_INTERVAL: u32 = 64;

/// Double-click detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleClickConfig {
    /// Maximum time between the two presses.
    pub timeout: Duration,
    /// Maximum distance in pixels, per axis, between the two presses.
    pub jitter: u32,
}

impl Default for DoubleClickConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(320),
            jitter: 4,
        }
    }
}

/// Configuration for an [`Application`].
#[derive(Debug, Clone)]
pub struct ApplicationConfig {
    /// Application name, used in logs and as the default window title.
    pub name: String,
    /// Period of window interval timers.
    pub interval: Duration,
    /// Run the reclaim hook every this many idle waits. `None` disables it.
    pub reclaim_interval: Option<u32>,
    /// Double-click thresholds for windows.
    pub double_click: DoubleClickConfig,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "weft".to_string(),
            interval: DEFAULT_INTERVAL,
            reclaim_interval: Some(DEFAULT_RECLAIM_INTERVAL),
            double_click: DoubleClickConfig::default(),
        }
    }
}

impl ApplicationConfig {
    /// Create a configuration with the given name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Builder for creating an [`Application`] with custom configuration.
#[derive(Default)]
pub struct ApplicationBuilder {
    config: ApplicationConfig,
    display: Option<Box<dyn Display>>,
}

impl ApplicationBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the window interval period.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Set how many idle waits pass between reclaim hook runs.
    pub fn reclaim_interval(mut self, waits: Option<u32>) -> Self {
        self.config.reclaim_interval = waits;
        self
    }

    /// Set the double-click thresholds.
    pub fn double_click(mut self, double_click: DoubleClickConfig) -> Self {
        self.config.double_click = double_click;
        self
    }

    /// Use a custom display backend instead of the headless queue.
    pub fn display(mut self, display: impl Display + 'static) -> Self {
        self.display = Some(Box::new(display));
        self
    }

    /// Build the application.
    pub fn build(self) -> Application {
        match self.display {
            Some(display) => Application::with_display(self.config, display),
            None => Application::new(self.config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApplicationConfig::default();
        assert_eq!(config.interval, Duration::from_millis(20));
        assert_eq!(config.reclaim_interval, Some(64));
        assert_eq!(config.double_click.timeout, Duration::from_millis(320));
        assert_eq!(config.double_click.jitter, 4);
    }

    #[test]
    fn test_builder() {
        let app = ApplicationBuilder::new()
            .name("demo")
            .interval(Duration::from_millis(5))
            .reclaim_interval(None)
            .build();
        assert_eq!(app.config().name, "demo");
        assert_eq!(app.config().interval, Duration::from_millis(5));
        assert_eq!(app.config().reclaim_interval, None);
        assert!(app.input_sender().is_some());
    }
}
