// SPDX-License-Identifier: MIT

//! Engine configuration

use std::time::Duration;

const MAX_PARALLEL_VAR: &str = "STEPFLOW_MAX_PARALLEL";
const WAIT_TIMEOUT_VAR: &str = "STEPFLOW_WAIT_TIMEOUT_SECS";

/// Tunables of an execution session
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Upper bound on nodes executing at the same time
    pub max_parallel_nodes: usize,
    /// Default timeout for waits issued by drivers
    pub wait_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            max_parallel_nodes: cpus.max(1),
            wait_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `STEPFLOW_MAX_PARALLEL` / `STEPFLOW_WAIT_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(MAX_PARALLEL_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_parallel_nodes = n,
                _ => log::warn!("Ignoring invalid {}='{}'", MAX_PARALLEL_VAR, raw),
            }
        }

        if let Ok(raw) = std::env::var(WAIT_TIMEOUT_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config.wait_timeout = Duration::from_secs(secs),
                Err(_) => log::warn!("Ignoring invalid {}='{}'", WAIT_TIMEOUT_VAR, raw),
            }
        }

        config
    }

    pub fn with_max_parallel(mut self, n: usize) -> Self {
        self.max_parallel_nodes = n.max(1);
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }
}
