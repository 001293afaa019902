//! Configuration for QueueKV
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{BrokerError, Result};

/// Main configuration for a QueueKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections (size of the worker pool)
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // GET Configuration
    // -------------------------------------------------------------------------
    /// Sleep between dequeue attempts for consumers without a wake-up signal
    pub poll_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Queue Configuration
    // -------------------------------------------------------------------------
    /// Max items held per consumer group (0 = unbounded)
    pub max_queue_items: usize,

    /// Create queues on first reference instead of rejecting unknown names
    pub auto_create_queues: bool,

    /// Drop a named consumer group after this long without a reader
    /// (milliseconds, 0 = keep forever)
    pub group_idle_timeout_ms: u64,

    /// Largest accepted SET payload (in bytes)
    pub max_value_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:22133".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            poll_interval_ms: 50,
            max_queue_items: 0,
            auto_create_queues: true,
            group_idle_timeout_ms: 10 * 60 * 1000, // 10 minutes
            max_value_size: 1024 * 1024, // 1 MB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Polling interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Idle timeout for named consumer groups, if eviction is enabled
    pub fn group_idle_timeout(&self) -> Option<Duration> {
        (self.group_idle_timeout_ms > 0).then(|| Duration::from_millis(self.group_idle_timeout_ms))
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(BrokerError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(BrokerError::Config(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.max_value_size == 0 {
            return Err(BrokerError::Config(
                "max_value_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the dequeue polling interval (in milliseconds)
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the per-group item limit (0 = unbounded)
    pub fn max_queue_items(mut self, count: usize) -> Self {
        self.config.max_queue_items = count;
        self
    }

    /// Enable or disable implicit queue creation
    pub fn auto_create_queues(mut self, enabled: bool) -> Self {
        self.config.auto_create_queues = enabled;
        self
    }

    /// Set the consumer-group idle timeout (in milliseconds, 0 = never)
    pub fn group_idle_timeout_ms(mut self, ms: u64) -> Self {
        self.config.group_idle_timeout_ms = ms;
        self
    }

    /// Set the largest accepted SET payload (in bytes)
    pub fn max_value_size(mut self, size: usize) -> Self {
        self.config.max_value_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
