//! Pool configuration types

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Placement policy for resources returned to the idle set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Strategy {
    /// Returned resources join the tail of the idle set; the longest-idle
    /// resource is borrowed first.
    #[default]
    Fifo,
    /// Returned resources join the head of the idle set; the most recently
    /// used resource is borrowed first.
    Lifo,
}

/// Configuration for a resource pool
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfig {
    /// Upper bound on the number of resources the pool manages
    pub max: usize,
    /// Lower bound maintained opportunistically; pre-warmed on start
    pub min: usize,
    /// Placement policy for returned resources
    pub strategy: Strategy,
    /// Number of priority classes for acquire; priorities are clamped into
    /// `[0, priority_range)`, 0 being the highest
    pub priority_range: usize,
    /// Validate a resource before handing it out
    pub test_on_borrow: bool,
    /// Validate a resource before returning it to the idle set
    pub test_on_return: bool,
    /// Maximum time an acquire may wait; `None` waits indefinitely
    pub acquire_timeout: Option<Duration>,
    /// Idle time after which a resource becomes eligible for eviction;
    /// `None` disables idle-based eviction
    pub idle_timeout: Option<Duration>,
    /// Age after which a resource becomes eligible for eviction regardless
    /// of use; `None` disables lifetime-based eviction
    pub max_lifetime: Option<Duration>,
    /// Period of the background eviction sweep; `None` disables the sweep
    pub eviction_interval: Option<Duration>,
    /// Maximum number of idle resources inspected per eviction sweep
    pub num_tests_per_run: usize,
    /// Start pre-warming and the evictor on construction; otherwise the
    /// first acquire starts them
    pub autostart: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max: 1,
            min: 0,
            strategy: Strategy::Fifo,
            priority_range: 1,
            test_on_borrow: false,
            test_on_return: false,
            acquire_timeout: None,
            idle_timeout: None,
            max_lifetime: None,
            eviction_interval: None,
            num_tests_per_run: 3,
            autostart: true,
        }
    }
}

impl PoolConfig {
    /// Validate pool configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max == 0 {
            return Err(Error::configuration("max must be greater than 0"));
        }
        if self.min > self.max {
            return Err(Error::configuration(format!(
                "min ({}) must not exceed max ({})",
                self.min, self.max
            )));
        }
        if self.priority_range == 0 {
            return Err(Error::configuration("priority_range must be at least 1"));
        }
        Ok(())
    }
}
