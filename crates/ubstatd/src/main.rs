//! ubstatd - resolver statistics collector daemon.
//!
//! Polls one or more Unbound resolvers over remote control and prints every
//! cycle's metrics as one JSON line on stdout.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use ubstat_core::collector::unbound::MODULE_NAME;
use ubstat_core::config::{DEFAULT_ADDRESS, UnboundConfig};
use ubstat_core::module::{Module, ModuleRegistry, register_builtin};
use ubstat_core::rates::EmittedMetrics;

/// Resolver statistics collector daemon.
#[derive(Parser)]
#[command(name = "ubstatd", about = "Resolver statistics collector daemon", version)]
struct Args {
    /// Control interface as host:port, or a domain socket path.
    #[arg(long, default_value = DEFAULT_ADDRESS, env = "UBSTATD_ADDRESS")]
    address: String,

    /// Native resolver configuration used for autodetection.
    /// Pass an empty string to disable autodetection.
    #[arg(long, value_name = "PATH", env = "UBSTATD_CONF_PATH")]
    conf_path: Option<String>,

    /// Bound on one remote-control exchange, in seconds.
    #[arg(long, default_value = "1")]
    timeout: f64,

    /// Report life-of-service totals instead of per-interval deltas.
    #[arg(long)]
    cumulative: bool,

    /// Use TLS for TCP control interfaces. Disable with --use-tls=false.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    use_tls: bool,

    /// Client certificate (PEM).
    #[arg(long, value_name = "PATH")]
    tls_cert: Option<PathBuf>,

    /// Client private key (PEM: PKCS#8, PKCS#1 RSA or SEC1 EC).
    #[arg(long, value_name = "PATH")]
    tls_key: Option<PathBuf>,

    /// CA certificate used to verify the server.
    #[arg(long, value_name = "PATH")]
    tls_ca: Option<PathBuf>,

    /// Skip server certificate verification.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    tls_skip_verify: bool,

    /// Collection interval in seconds.
    #[arg(short, long, default_value = "1", env = "UBSTATD_INTERVAL")]
    interval: u64,

    /// JSON file with a list of jobs. Replaces the single job built from
    /// the flags above.
    #[arg(long, value_name = "FILE", env = "UBSTATD_JOBS")]
    jobs: Option<PathBuf>,

    /// Collect once and exit.
    #[arg(long)]
    once: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// One entry of the `--jobs` file.
#[derive(Debug, Deserialize)]
struct JobSpec {
    name: String,
    #[serde(default = "default_module")]
    module: String,
    #[serde(default)]
    config: serde_json::Value,
}

fn default_module() -> String {
    MODULE_NAME.to_string()
}

/// Line printed for every non-empty collection.
#[derive(Serialize)]
struct Sample<'a> {
    timestamp: String,
    job: &'a str,
    metrics: &'a EmittedMetrics,
}

struct Job {
    name: String,
    module: Box<dyn Module>,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["ubstatd", "ubstat_core"] {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("invalid log directive for {}: {}", target, e),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Builds the single job described by command-line flags.
fn job_from_args(args: &Args) -> Result<JobSpec, String> {
    let timeout = Duration::try_from_secs_f64(args.timeout)
        .map_err(|e| format!("invalid --timeout {}: {}", args.timeout, e))?;

    let mut config = UnboundConfig {
        address: args.address.clone(),
        timeout,
        cumulative_stats: args.cumulative,
        use_tls: args.use_tls,
        tls_ca: args.tls_ca.clone(),
        tls_skip_verify: args.tls_skip_verify,
        ..UnboundConfig::default()
    };
    if let Some(path) = &args.conf_path {
        config.conf_path = Some(PathBuf::from(path));
    }
    if let Some(cert) = &args.tls_cert {
        config.tls_cert = cert.clone();
    }
    if let Some(key) = &args.tls_key {
        config.tls_key = key.clone();
    }

    let config = serde_json::to_value(&config).map_err(|e| e.to_string())?;
    Ok(JobSpec {
        name: "local".to_string(),
        module: default_module(),
        config,
    })
}

fn load_jobs(path: &Path) -> Result<Vec<JobSpec>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("reading '{}': {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("parsing '{}': {}", path.display(), e))
}

/// Creates and initializes modules; jobs whose `init` fails are dropped.
fn start_jobs(registry: &ModuleRegistry, specs: Vec<JobSpec>) -> Vec<Job> {
    let mut jobs = Vec::new();
    for spec in specs {
        let mut module = match registry.create(&spec.module, &spec.config) {
            Ok(module) => module,
            Err(e) => {
                error!(job = %spec.name, error = %e, "skipping job");
                continue;
            }
        };
        if !module.init() {
            warn!(job = %spec.name, module = %spec.module, "init failed, job disabled");
            continue;
        }
        if !module.check() {
            warn!(job = %spec.name, "check failed, will keep polling");
        }
        info!(job = %spec.name, module = %spec.module, "job started");
        jobs.push(Job {
            name: spec.name,
            module,
        });
    }
    jobs
}

fn emit(job: &str, metrics: &EmittedMetrics) {
    let sample = Sample {
        timestamp: Utc::now().to_rfc3339(),
        job,
        metrics,
    };
    match serde_json::to_string(&sample) {
        Ok(line) => println!("{}", line),
        Err(e) => error!(job, error = %e, "serializing metrics"),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("ubstatd {} starting", env!("CARGO_PKG_VERSION"));

    let mut registry = ModuleRegistry::new();
    if let Err(e) = register_builtin(&mut registry) {
        error!(error = %e, "registering modules");
        return ExitCode::FAILURE;
    }
    debug!(modules = ?registry.names().collect::<Vec<_>>(), "modules registered");

    let specs = match &args.jobs {
        Some(path) => load_jobs(path),
        None => job_from_args(&args).map(|job| vec![job]),
    };
    let specs = match specs {
        Ok(specs) => specs,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut jobs = start_jobs(&registry, specs);
    if jobs.is_empty() {
        error!("no job could be started");
        return ExitCode::FAILURE;
    }

    let interval = Duration::from_secs(args.interval.max(1));
    info!(jobs = jobs.len(), interval = ?interval, "starting collection loop");

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    while running.load(Ordering::SeqCst) {
        for job in &mut jobs {
            let metrics = job.module.collect();
            if metrics.is_empty() {
                debug!(job = %job.name, "no data");
                continue;
            }
            emit(&job.name, &metrics);
        }

        if args.once {
            break;
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutting down...");
    for job in &mut jobs {
        job.module.cleanup();
    }
    info!("Shutdown complete");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_build_an_unbound_job() {
        let args = Args::parse_from([
            "ubstatd",
            "--address",
            "/run/unbound.ctl",
            "--conf-path",
            "",
            "--cumulative",
            "--timeout",
            "2.5",
        ]);
        let job = job_from_args(&args).unwrap();
        assert_eq!(job.module, "unbound");

        let config: UnboundConfig = serde_json::from_value(job.config).unwrap();
        assert_eq!(config.address, "/run/unbound.ctl");
        assert_eq!(config.conf_path(), None);
        assert!(config.cumulative_stats);
        assert_eq!(config.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn negative_timeout_rejected() {
        let args = Args::parse_from(["ubstatd", "--timeout=-1"]);
        assert!(job_from_args(&args).is_err());
    }

    #[test]
    fn jobs_file_defaults_module() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        std::fs::write(
            &path,
            r#"[{"name": "a", "config": {"address": "/run/a.ctl"}}, {"name": "b", "module": "unbound"}]"#,
        )
        .unwrap();

        let jobs = load_jobs(&path).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].module, "unbound");
        assert!(jobs[1].config.is_null());
    }

    #[test]
    fn failing_jobs_are_dropped() {
        let mut registry = ModuleRegistry::new();
        register_builtin(&mut registry).unwrap();

        let specs = vec![
            JobSpec {
                name: "unknown".to_string(),
                module: "nginx".to_string(),
                config: serde_json::Value::Null,
            },
            JobSpec {
                name: "bad".to_string(),
                module: "unbound".to_string(),
                config: serde_json::json!({"address": "", "conf_path": ""}),
            },
        ];
        assert!(start_jobs(&registry, specs).is_empty());
    }
}
