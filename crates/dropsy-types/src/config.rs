//! Configuration value types for Dropsy
//!
//! Validated newtypes shared by the configuration layer and the engine.

use std::time::Duration;

/// Maximum number of directories a single monitor may watch
pub const DIRS_MAX: usize = 256;

/// Program name, used for the state directory (`~/.dropsy`)
pub const PROGRAM_NAME: &str = "dropsy";

/// Maximum number of transfer jobs running at once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parallelism(usize);

impl Parallelism {
    /// Minimum parallelism
    pub const MIN: usize = 1;
    /// Maximum parallelism
    ///
    /// Every running job owns one child process and its pipes, so the limit is
    /// capped at the same bound as the directory count.
    pub const MAX: usize = DIRS_MAX;

    /// Create a new parallelism limit with validation
    pub fn new(limit: usize) -> Result<Self, String> {
        if limit < Self::MIN {
            Err(format!("Parallelism {} is below minimum {}", limit, Self::MIN))
        } else if limit > Self::MAX {
            Err(format!("Parallelism {} exceeds maximum {}", limit, Self::MAX))
        } else {
            Ok(Self(limit))
        }
    }

    /// Get the limit value
    pub fn get(self) -> usize {
        self.0
    }

    /// One job per CPU
    pub fn optimal() -> Self {
        Self(num_cpus::get().clamp(Self::MIN, Self::MAX))
    }
}

impl Default for Parallelism {
    fn default() -> Self {
        Self::optimal()
    }
}

/// Delay between watch cycles; zero means a single cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PollInterval(u64);

impl PollInterval {
    /// Run exactly one cycle
    pub const ONCE: Self = Self(0);

    /// Create a poll interval in seconds
    pub fn from_secs(seconds: u64) -> Self {
        Self(seconds)
    }

    /// Interval in seconds
    pub fn as_secs(self) -> u64 {
        self.0
    }

    /// Whether the monitor should loop
    pub fn is_polling(self) -> bool {
        self.0 > 0
    }

    /// Interval as a duration
    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallelism_validation() {
        assert!(Parallelism::new(0).is_err());
        assert!(Parallelism::new(1).is_ok());
        assert!(Parallelism::new(256).is_ok());
        assert!(Parallelism::new(257).is_err());
        assert!(Parallelism::optimal().get() >= 1);
    }

    #[test]
    fn test_poll_interval() {
        assert!(!PollInterval::ONCE.is_polling());
        assert!(PollInterval::from_secs(5).is_polling());
        assert_eq!(PollInterval::from_secs(5).as_duration(), Duration::from_secs(5));
    }
}
