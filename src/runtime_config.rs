//! # Runtime Configuration Module
//!
//! Environment-variable configuration for how a generation batch runs.
//!
//! ## Environment Variables
//!
//! ### `OMNIGEN_WORKERS`
//!
//! Number of threads rendering template-path units. `1` (the default) runs
//! every unit sequentially on the calling thread.
//!
//! ### `OMNIGEN_LLM_WORKERS`
//!
//! Number of threads waiting on chat-completion calls. Kept separate from
//! rendering so long model calls cannot starve template rendering.
//! Default: `1`.
//!
//! ### `OMNIGEN_LLM_TIMEOUT_SECS`
//!
//! Timeout for a single chat-completion call. Generation of a large file can
//! take minutes. Default: `600`.
//!
//! ## Usage
//!
//! ```rust
//! use omnigen::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("render workers: {}", config.workers);
//! ```

use std::env;
use std::time::Duration;

const DEFAULT_LLM_TIMEOUT_SECS: u64 = 600;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Threads rendering template-path units (default: 1)
    pub workers: usize,
    /// Threads running LLM-path units (default: 1)
    pub llm_workers: usize,
    /// Timeout for one chat-completion call (default: 600 s)
    pub llm_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            llm_workers: 1,
            llm_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }
}

fn positive(var: &str) -> Option<usize> {
    env::var(var)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let llm_timeout = env::var("OMNIGEN_LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.llm_timeout);
        RuntimeConfig {
            workers: positive("OMNIGEN_WORKERS").unwrap_or(defaults.workers),
            llm_workers: positive("OMNIGEN_LLM_WORKERS").unwrap_or(defaults.llm_workers),
            llm_timeout,
        }
    }
}
