//! Configuration module
//!
//! Defaults, config files, run profiles and `FHIR_BENCH_*` environment
//! overrides. CLI flags are applied on top of all of these in `main`.

mod env;
mod file;
mod profile;

pub use env::{print_env_help, EnvConfig};
pub use file::ConfigFile;
pub use profile::RunProfile;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::benchmark::ControllerConfig;
use crate::fhir::{MatchModifier, DEFAULT_ABSENT_MARKER};
use crate::models::{CacheRule, FaultPolicy};

/// Public HAPI FHIR R4 test server
pub const DEFAULT_BASE_URL: &str = "http://hapi.fhir.org/baseR4";

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// FHIR server base URL
    pub base_url: String,

    /// Number of passes over the term list
    pub iterations: u32,

    /// Pause between iterations in seconds
    pub pause_secs: u64,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,

    /// File with one family name per line
    pub names_file: String,

    /// Project and print the last page of each iteration
    pub display: bool,

    pub fault_policy: FaultPolicy,

    pub cache_rule: CacheRule,

    /// Printed in place of a missing birth date
    pub absent_marker: String,

    /// Searches in flight per iteration
    pub concurrency: usize,

    /// Upper bound on a whole run, in seconds
    pub deadline_secs: Option<u64>,

    pub match_modifier: MatchModifier,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            iterations: 3,
            pause_secs: 5,
            timeout_secs: 30,
            names_file: "lastnames.txt".to_string(),
            display: false,
            fault_policy: FaultPolicy::Abort,
            cache_rule: CacheRule::default(),
            absent_marker: DEFAULT_ABSENT_MARKER.to_string(),
            concurrency: 1,
            deadline_secs: None,
            match_modifier: MatchModifier::Default,
        }
    }
}

impl AppConfig {
    /// Check values that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            anyhow::bail!("base_url must be an http(s) URL, got '{}'", self.base_url);
        }
        if self.iterations == 0 {
            anyhow::bail!("iterations must be at least 1");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be at least 1");
        }
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.cache_rule.disable_on.contains(&0) {
            anyhow::bail!("cache_rule.disable_on uses 1-based iteration numbers");
        }
        Ok(())
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(url) = &env.base_url {
            self.base_url = url.clone();
        }
        if let Some(iterations) = env.iterations {
            self.iterations = iterations;
        }
        if let Some(pause) = env.pause_secs {
            self.pause_secs = pause;
        }
        if let Some(timeout) = env.timeout_secs {
            self.timeout_secs = timeout;
        }
        if let Some(names) = &env.names_file {
            self.names_file = names.clone();
        }
        if let Some(display) = env.display {
            self.display = display;
        }
        if let Some(policy) = env.fault_policy {
            self.fault_policy = policy;
        }
        if let Some(concurrency) = env.concurrency {
            self.concurrency = concurrency;
        }
    }

    /// Apply a run profile's iteration settings
    pub fn apply_profile(&mut self, profile: &RunProfile) {
        self.iterations = profile.iterations;
        self.pause_secs = profile.pause_secs;
        self.cache_rule = profile.cache_rule.clone();
    }

    /// Controller settings derived from this configuration
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig::default()
            .with_cache_rule(self.cache_rule.clone())
            .with_pause(Duration::from_secs(self.pause_secs))
            .with_fault_policy(self.fault_policy)
            .with_display(self.display)
            .with_concurrency(self.concurrency)
            .with_deadline(self.deadline_secs.map(Duration::from_secs))
    }
}
