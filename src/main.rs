//! fhir-bench - FHIR Patient Search Latency Benchmark
//!
//! A CLI tool that runs repeated family-name searches against a FHIR server,
//! records per-search and per-iteration latency with and without server-side
//! caching, and prints the returned patients in a stable order.
//!
//! ## Features
//!
//! - Per-call timing through interceptors injected into the HTTP client
//! - Cache mode chosen per iteration (`Cache-Control: no-cache` on chosen passes)
//! - Abort or continue on failed searches
//! - Multiple output formats (Text, JSON, CSV)
//! - YAML/JSON config files, `FHIR_BENCH_*` environment overrides and run profiles
//!
//! ## Usage
//!
//! ```bash
//! # Three iterations, cache disabled on the third
//! fhir-bench run --names lastnames.txt --display
//!
//! # Bypass the cache on iterations 2 and 4
//! fhir-bench run --iterations 4 --disable-cache-on 2,4
//!
//! # Single search
//! fhir-bench search SMITH --no-cache
//!
//! # Write an example config
//! fhir-bench config init
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

mod benchmark;
mod cli;
mod config;
mod fhir;
mod http;
mod input;
mod models;
mod output;
mod utils;

use benchmark::{IterationController, RunStatus, RunSummary};
use cli::Args;
use config::{AppConfig, ConfigFile, EnvConfig, RunProfile};
use fhir::{FhirClient, MatchModifier, RecordSearch, ResultProjector};
use http::{InterceptorChain, LatestTiming, TracingInterceptor};
use models::{CacheMode, CacheRule, FaultPolicy, QueryTerm};
use output::{OutputFormat, ReportFormatter};
use utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logger(log_level(args.log_level.as_deref(), args.verbose)?);

    let env = EnvConfig::load();
    let config_path = args.config.clone().or_else(|| env.config_file.clone());

    match args.command {
        cli::Command::Run(run_args) => {
            let file = load_config_file(config_path.as_deref())?;
            run_benchmark(run_args, file, &env).await?;
        }
        cli::Command::Search(search_args) => {
            let file = load_config_file(config_path.as_deref())?;
            run_search(search_args, file, &env).await?;
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args, config_path.as_deref(), &env)?;
        }
    }

    Ok(())
}

/// `--log-level` wins over `--verbose`
fn log_level(requested: Option<&str>, verbose: bool) -> Result<LogLevel> {
    match requested {
        Some(level) => LogLevel::from_str(level).ok_or_else(|| {
            anyhow::anyhow!("Unknown log level: {level} (expected trace, debug, info, warn or error)")
        }),
        None if verbose => Ok(LogLevel::Debug),
        None => Ok(LogLevel::Info),
    }
}

fn load_config_file(path: Option<&str>) -> Result<ConfigFile> {
    match path {
        Some(path) => ConfigFile::load(path),
        None => ConfigFile::load_default(),
    }
}

/// Defaults, then file, then environment
fn base_config(file: &ConfigFile, env: &EnvConfig) -> AppConfig {
    let mut app = file.app.clone();
    app.apply_env(env);
    app
}

fn parse_match_mode(value: &str) -> Result<MatchModifier> {
    MatchModifier::from_str(value).ok_or_else(|| {
        anyhow::anyhow!("Unknown match mode: {value} (expected default, exact or contains)")
    })
}

/// Client reporting every call to the latest-timing slot and the log
fn build_client(app: &AppConfig) -> Result<(FhirClient, Arc<LatestTiming>)> {
    let latest = Arc::new(LatestTiming::new());
    let chain = InterceptorChain::new()
        .with(latest.clone())
        .with(Arc::new(TracingInterceptor));

    let client = FhirClient::new(&app.base_url, app.timeout_secs, Arc::new(chain))
        .with_context(|| format!("Failed to create FHIR client for {}", app.base_url))?
        .with_match_modifier(app.match_modifier);

    Ok((client, latest))
}

async fn run_benchmark(args: cli::RunArgs, file: ConfigFile, env: &EnvConfig) -> Result<()> {
    let mut app = base_config(&file, env);

    if let Some(name) = &args.profile {
        let profile = file
            .profile(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown profile: {name}"))?;
        info!("Using profile '{}': {}", profile.name, profile.description);
        app.apply_profile(&profile);
    }

    if let Some(iterations) = args.iterations {
        app.iterations = iterations;
    }
    if let Some(pause) = args.pause {
        app.pause_secs = pause;
    }
    if let Some(names) = args.names {
        app.names_file = names;
    }
    if let Some(url) = args.base_url {
        app.base_url = url;
    }
    if args.display {
        app.display = true;
    }
    if args.continue_on_error {
        app.fault_policy = FaultPolicy::Continue;
    }
    if let Some(disable_on) = args.disable_cache_on {
        app.cache_rule = CacheRule::disable_on(disable_on);
    }
    if let Some(concurrency) = args.concurrency {
        app.concurrency = concurrency;
    }
    if let Some(deadline) = args.deadline {
        app.deadline_secs = Some(deadline);
    }
    if let Some(timeout) = args.timeout {
        app.timeout_secs = timeout;
    }
    if let Some(mode) = &args.match_mode {
        app.match_modifier = parse_match_mode(mode)?;
    }
    if let Some(marker) = args.absent_marker {
        app.absent_marker = marker;
    }

    app.validate()?;

    let format = OutputFormat::from_str(&args.format)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {}", args.format))?;

    let terms = input::load_terms(&app.names_file)?;

    info!(
        "Benchmarking {} with {} terms, {} iterations",
        app.base_url,
        terms.len(),
        app.iterations
    );

    let (client, latest) = build_client(&app)?;
    let mut controller = IterationController::new(client, app.controller_config())
        .with_projector(ResultProjector::new(app.absent_marker.clone()));

    let stop = controller.stop_handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current search");
            stop.stop();
        }
    });

    let started_at = Utc::now();
    let result = controller.run(&terms, app.iterations).await;
    ctrl_c.abort();

    if let Some(last) = latest.current() {
        debug!("Last completed call took {}", last);
    }

    let status = RunStatus::from_result(&result);
    let summary = RunSummary::new(
        app.base_url.clone(),
        controller.config(),
        controller.store(),
        started_at,
        app.iterations,
        status,
    );

    match result {
        Ok(_) => {
            emit_report(&summary, format, args.output.as_deref())?;
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {}", e);
            if !summary.history.is_empty() {
                warn!(
                    "Reporting the {} samples recorded before the failure as incomplete",
                    summary.history.len()
                );
                emit_report(&summary, format, args.output.as_deref())?;
            }
            Err(e.into())
        }
    }
}

fn emit_report(summary: &RunSummary, format: OutputFormat, path: Option<&str>) -> Result<()> {
    let rendered = ReportFormatter::new(format).render(summary)?;
    print!("{rendered}");

    if let Some(path) = path {
        output::write_report_to_file(path, summary, format)?;
        info!("Report saved to {}", path);
    }

    Ok(())
}

async fn run_search(args: cli::SearchArgs, file: ConfigFile, env: &EnvConfig) -> Result<()> {
    let mut app = base_config(&file, env);
    if let Some(url) = args.base_url {
        app.base_url = url;
    }
    if let Some(mode) = &args.match_mode {
        app.match_modifier = parse_match_mode(mode)?;
    }
    if let Some(marker) = args.absent_marker {
        app.absent_marker = marker;
    }
    app.validate()?;

    let term = QueryTerm::parse(&args.family)
        .ok_or_else(|| anyhow::anyhow!("Family name must not be empty"))?;
    let cache = if args.no_cache {
        CacheMode::Disabled
    } else {
        CacheMode::Enabled
    };

    let (client, latest) = build_client(&app)?;
    let response = client
        .search(&term, cache)
        .await
        .with_context(|| format!("Search for '{term}' failed"))?;

    let projector = ResultProjector::new(app.absent_marker.clone());
    for line in projector.project(&response.page) {
        println!("{line}");
    }

    debug!("Interceptor recorded {:?}", latest.current());
    println!("For name: {}, time taken: {}", term, response.latency);

    Ok(())
}

fn manage_config(args: cli::ConfigArgs, path: Option<&str>, env: &EnvConfig) -> Result<()> {
    use std::path::Path;

    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = Path::new(&output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {output}. Use --force to overwrite."
                );
            }

            ConfigFile::example().save(path)?;
            println!("✓ Configuration file created: {output}");
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show { format } => {
            let mut file = load_config_file(path)?;
            file.app = base_config(&file, env);
            let output = if format == "json" {
                serde_json::to_string_pretty(&file)?
            } else {
                serde_yaml::to_string(&file)?
            };
            println!("{output}");

            if env.has_any() {
                println!();
                env.print_summary();
            }
        }

        cli::ConfigAction::Validate { file } => {
            let path = file
                .or_else(|| path.map(str::to_string))
                .or_else(|| ConfigFile::find().map(|p| p.to_string_lossy().to_string()))
                .unwrap_or_else(|| "./fhir-bench.yaml".to_string());

            match ConfigFile::load(&path) {
                Ok(_) => {
                    println!("✓ Configuration file is valid: {path}");
                }
                Err(e) => {
                    println!("✗ Configuration file is invalid: {path}");
                    println!("  Error: {e:#}");
                    return Err(e);
                }
            }
        }

        cli::ConfigAction::Profiles => {
            let file = load_config_file(path)?;
            let mut profiles = file.profiles.clone();
            for builtin in RunProfile::builtin() {
                if !profiles.iter().any(|p| p.name == builtin.name) {
                    profiles.push(builtin);
                }
            }

            println!("Run Profiles:");
            for profile in profiles {
                let disabled: Vec<_> = (1..=profile.iterations)
                    .filter(|&i| profile.cache_rule.cache_mode(i) == CacheMode::Disabled)
                    .map(|i| i.to_string())
                    .collect();
                println!(
                    "  {:12} {:2} iterations, pause {}s, cache disabled on [{}]  {}",
                    profile.name,
                    profile.iterations,
                    profile.pause_secs,
                    disabled.join(","),
                    profile.description
                );
            }
        }

        cli::ConfigAction::Env => {
            config::print_env_help();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_flag_wins_over_verbose() {
        assert_eq!(log_level(Some("warn"), true).unwrap(), LogLevel::Warn);
        assert_eq!(log_level(None, true).unwrap(), LogLevel::Debug);
        assert_eq!(log_level(None, false).unwrap(), LogLevel::Info);
        assert!(log_level(Some("loud"), false).is_err());
    }
}
