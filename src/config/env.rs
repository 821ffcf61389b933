//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

use crate::models::FaultPolicy;

/// Environment variable prefix
const ENV_PREFIX: &str = "FHIR_BENCH";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Base URL from FHIR_BENCH_BASE_URL
    pub base_url: Option<String>,
    /// Iterations from FHIR_BENCH_ITERATIONS
    pub iterations: Option<u32>,
    /// Pause from FHIR_BENCH_PAUSE
    pub pause_secs: Option<u64>,
    /// Timeout from FHIR_BENCH_TIMEOUT
    pub timeout_secs: Option<u64>,
    /// Term file from FHIR_BENCH_NAMES
    pub names_file: Option<String>,
    /// Display from FHIR_BENCH_DISPLAY
    pub display: Option<bool>,
    /// Fault policy from FHIR_BENCH_FAULT_POLICY
    pub fault_policy: Option<FaultPolicy>,
    /// Concurrency from FHIR_BENCH_CONCURRENCY
    pub concurrency: Option<usize>,
    /// Config file from FHIR_BENCH_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            base_url: get_env("BASE_URL"),
            iterations: get_env_parse("ITERATIONS"),
            pause_secs: get_env_parse("PAUSE"),
            timeout_secs: get_env_parse("TIMEOUT"),
            names_file: get_env("NAMES"),
            display: get_env_bool("DISPLAY"),
            fault_policy: get_env("FAULT_POLICY").and_then(|v| FaultPolicy::from_str(&v)),
            concurrency: get_env_parse("CONCURRENCY"),
            config_file: get_env("CONFIG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.base_url.is_some()
            || self.iterations.is_some()
            || self.pause_secs.is_some()
            || self.timeout_secs.is_some()
            || self.names_file.is_some()
            || self.display.is_some()
            || self.fault_policy.is_some()
            || self.concurrency.is_some()
            || self.config_file.is_some()
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_BASE_URL:          {:?}", ENV_PREFIX, self.base_url);
        println!("  {}_ITERATIONS:        {:?}", ENV_PREFIX, self.iterations);
        println!("  {}_PAUSE:             {:?}", ENV_PREFIX, self.pause_secs);
        println!("  {}_TIMEOUT:           {:?}", ENV_PREFIX, self.timeout_secs);
        println!("  {}_NAMES:             {:?}", ENV_PREFIX, self.names_file);
        println!("  {}_DISPLAY:           {:?}", ENV_PREFIX, self.display);
        println!("  {}_FAULT_POLICY:      {:?}", ENV_PREFIX, self.fault_policy);
        println!("  {}_CONCURRENCY:       {:?}", ENV_PREFIX, self.concurrency);
        println!("  {}_CONFIG:            {:?}", ENV_PREFIX, self.config_file);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Print all FHIR_BENCH environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_BASE_URL           FHIR server base URL");
    println!("  {ENV_PREFIX}_ITERATIONS         Number of iterations");
    println!("  {ENV_PREFIX}_PAUSE              Pause between iterations in seconds");
    println!("  {ENV_PREFIX}_TIMEOUT            Request timeout in seconds");
    println!("  {ENV_PREFIX}_NAMES              File with one family name per line");
    println!("  {ENV_PREFIX}_DISPLAY            Print projected records (true/false)");
    println!("  {ENV_PREFIX}_FAULT_POLICY       abort (default) or continue on failed searches");
    println!("  {ENV_PREFIX}_CONCURRENCY        Searches in flight per iteration");
    println!("  {ENV_PREFIX}_CONFIG             Path to configuration file");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_BASE_URL=http://hapi.fhir.org/baseR4");
    println!("  export {ENV_PREFIX}_ITERATIONS=5");
    println!("  fhir-bench run --display");
}
