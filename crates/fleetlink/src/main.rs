// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fleetlink - fleet telemetry data manager.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod shutdown;
mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use clap::{Parser, Subcommand};
use fleetlink_client::HttpRemote;
use fleetlink_config::FleetlinkConfig;
use fleetlink_core::FleetError;
use fleetlink_core::types::{ReportInterval, ReportJob};
use fleetlink_manager::DataManager;
use serde::Serialize;

/// Fleetlink - fleet telemetry data manager.
#[derive(Parser, Debug)]
#[command(name = "fleetlink", version, about, long_about = None)]
struct Cli {
    /// Explicit config file, bypassing the default search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream fleet status and unit updates until interrupted.
    Watch {
        /// Print Prometheus metrics on exit.
        #[arg(long)]
        metrics: bool,
    },
    /// Print the current fleet status as JSON.
    Status,
    /// Print one enriched unit as JSON.
    Unit {
        /// Platform unit id.
        id: u64,
    },
    /// Execute a report and print its tables and charts as JSON.
    Report {
        /// Resource that owns the report template.
        #[arg(long)]
        resource: u64,
        /// Report template id within the resource.
        #[arg(long)]
        template: u64,
        /// Unit or group the report runs over.
        #[arg(long)]
        object: Option<u64>,
        /// Interval length ending now, in hours.
        #[arg(long, default_value_t = 24)]
        hours: u32,
        /// Run on the platform's report queue and poll for completion.
        #[arg(long)]
        remote: bool,
    },
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => fleetlink_config::load_and_validate_path(path),
        None => fleetlink_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            fleetlink_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    let result = match cli.command {
        Some(Commands::Config) => print_config(&config),
        Some(Commands::Watch { metrics }) => match manager(&config) {
            Ok(manager) => watch::run_watch(manager, metrics).await,
            Err(e) => Err(e),
        },
        Some(Commands::Status) => {
            one_shot(&config, |manager| async move {
                manager.initialize().await?;
                print_json(&manager.get_fleet_status())
            })
            .await
        }
        Some(Commands::Unit { id }) => {
            one_shot(&config, |manager| async move {
                let unit = manager.get_unit_details(id).await?;
                print_json(unit.as_ref())
            })
            .await
        }
        Some(Commands::Report {
            resource,
            template,
            object,
            hours,
            remote,
        }) => {
            let to = Utc::now();
            let job = ReportJob {
                template_id: template,
                resource_id: resource,
                object_id: object,
                interval: ReportInterval {
                    from: to - TimeDelta::hours(i64::from(hours)),
                    to,
                    flags: 0,
                },
                remote,
            };
            one_shot(&config, |manager| async move {
                let report = manager.execute_report(&job).await?;
                print_json(&report)
            })
            .await
        }
        None => {
            println!("fleetlink: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("fleetlink: {e}");
        std::process::exit(1);
    }
}

fn manager(config: &FleetlinkConfig) -> Result<Arc<DataManager>, FleetError> {
    let remote = Arc::new(HttpRemote::new(&config.platform)?);
    Ok(Arc::new(DataManager::new(remote, config)))
}

/// Runs `op` against a fresh manager and always cleans up afterwards.
async fn one_shot<F, Fut>(config: &FleetlinkConfig, op: F) -> Result<(), FleetError>
where
    F: FnOnce(Arc<DataManager>) -> Fut,
    Fut: std::future::Future<Output = Result<(), FleetError>>,
{
    let mut config = config.clone();
    config.poller.enabled = false;
    let manager = manager(&config)?;
    let result = op(Arc::clone(&manager)).await;
    manager.cleanup().await;
    result
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), FleetError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| FleetError::Internal(format!("failed to encode output: {e}")))?;
    println!("{out}");
    Ok(())
}

fn print_config(config: &FleetlinkConfig) -> Result<(), FleetError> {
    let mut shown = config.clone();
    if shown.platform.token.is_some() {
        shown.platform.token = Some("<redacted>".to_string());
    }
    let out = toml::to_string_pretty(&shown)
        .map_err(|e| FleetError::Internal(format!("failed to encode config: {e}")))?;
    print!("{out}");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr so JSON on stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fleetlink={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_report_arguments() {
        let cli = Cli::try_parse_from([
            "fleetlink", "report", "--resource", "500", "--template", "3", "--remote",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Report {
                resource,
                template,
                object,
                hours,
                remote,
            }) => {
                assert_eq!((resource, template, object, hours), (500, 3, None, 24));
                assert!(remote);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["fleetlink", "unit", "42", "--config", "/tmp/f.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/f.toml")));
        assert!(matches!(cli.command, Some(Commands::Unit { id: 42 })));
    }

    #[test]
    fn manager_requires_a_token() {
        match manager(&FleetlinkConfig::default()) {
            Err(err) => assert!(matches!(err, FleetError::Config(_))),
            Ok(_) => panic!("manager built without a token"),
        }
    }

    #[test]
    fn config_defaults_are_valid() {
        let config = fleetlink_config::load_and_validate_str("").unwrap();
        assert!(config.poller.enabled);
        assert!(print_config(&config).is_ok());
    }
}
