// # dyndnsd - dynamic DNS daemon
//
// Thin integration layer: reads configuration from the environment, sets up
// logging and the runtime, then hands over to `dyndns-core`.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `DYNDNS_DOMAIN`: Domain whose A/AAAA records are kept in sync (required)
// - `DYNDNS_ZONE_ID`: Cloudflare zone ID holding the records (required)
// - `DYNDNS_API_TOKEN`: Cloudflare API token with Zone:DNS:Edit permission (required)
// - `DYNDNS_INTERVAL_SECS`: Seconds between updates; unset or 0 updates once and exits
// - `DYNDNS_TRACE_TIMEOUT_SECS`: HTTP timeout for public IP lookups (default 10)
// - `DYNDNS_LOG_LEVEL`: trace, debug, info, warn or error (default info)
// - `DYNDNS_MODE`: set to `dry-run` to log updates instead of applying them
//
// ## Example
//
// ```bash
// export DYNDNS_DOMAIN=home.example.com
// export DYNDNS_ZONE_ID=023e105f4ecef8ad9ca31a8372d0c353
// export DYNDNS_API_TOKEN=your_token
// export DYNDNS_INTERVAL_SECS=300
//
// dyndnsd
// ```

use anyhow::Result;
use dyndns_core::config::{ProviderConfig, ResolverConfig, SyncConfig};
use dyndns_core::engine::{self, SyncDriver};
use dyndns_ip_trace::TraceResolver;
use dyndns_provider_cloudflare::CloudflareFactory;
use std::env;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Success or clean shutdown
/// - 1: Configuration error or fatal setup failure (credentials, records)
/// - 2: Failed update in run-once mode, or runtime error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DyndnsExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<DyndnsExitCode> for ExitCode {
    fn from(code: DyndnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    domain: String,
    zone_id: String,
    api_token: String,
    interval_secs: Option<u64>,
    trace_timeout_secs: u64,
    log_level: String,
}

// Keeps the API token out of logs
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("domain", &self.domain)
            .field("zone_id", &self.zone_id)
            .field("api_token", &"<REDACTED>")
            .field("interval_secs", &self.interval_secs)
            .field("trace_timeout_secs", &self.trace_timeout_secs)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} is required. Set it via: export {}=...", key, key))
        };
        let number = |key: &str, default: Option<u64>| -> Result<Option<u64>> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => value
                    .trim()
                    .parse()
                    .map(Some)
                    .map_err(|_| anyhow::anyhow!("{} must be a number of seconds. Got: {}", key, value)),
                _ => Ok(default),
            }
        };

        Ok(Self {
            domain: required("DYNDNS_DOMAIN")?,
            zone_id: required("DYNDNS_ZONE_ID")?,
            api_token: required("DYNDNS_API_TOKEN")?,
            interval_secs: number("DYNDNS_INTERVAL_SECS", None)?.filter(|secs| *secs > 0),
            trace_timeout_secs: number("DYNDNS_TRACE_TIMEOUT_SECS", Some(10))?.unwrap_or(10),
            log_level: lookup("DYNDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        // Check for obvious placeholder tokens (common mistake)
        let token_lower = self.api_token.to_lowercase();
        if token_lower.contains("your_token") || token_lower.contains("replace_me") {
            anyhow::bail!(
                "DYNDNS_API_TOKEN appears to be a placeholder. \
                Use an actual API token from your DNS provider."
            );
        }

        validate_domain_name(&self.domain)?;

        if let Some(interval) = self.interval_secs
            && !(10..=86400).contains(&interval)
        {
            anyhow::bail!(
                "DYNDNS_INTERVAL_SECS must be between 10 and 86400 seconds. Got: {}",
                interval
            );
        }

        if !(1..=120).contains(&self.trace_timeout_secs) {
            anyhow::bail!(
                "DYNDNS_TRACE_TIMEOUT_SECS must be between 1 and 120 seconds. Got: {}",
                self.trace_timeout_secs
            );
        }

        parse_log_level(&self.log_level)?;

        Ok(())
    }

    fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            domain: self.domain.clone(),
            provider: ProviderConfig::Cloudflare {
                api_token: self.api_token.clone(),
                zone_id: self.zone_id.clone(),
            },
            resolver: ResolverConfig {
                timeout_secs: self.trace_timeout_secs,
                ..ResolverConfig::default()
            },
            interval_secs: self.interval_secs,
        }
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DYNDNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

/// Validate that a string is a valid domain name
///
/// Basic DNS domain name validation per RFC 1035, catching common mistakes.
fn validate_domain_name(domain: &str) -> Result<()> {
    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.trim_end_matches('.').split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DyndnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DyndnsExitCode::ConfigError.into();
    }

    // Validated above
    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DyndnsExitCode::ConfigError.into();
    }

    info!("Starting dyndnsd for {}", config.domain);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DyndnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(config)).into()
}

async fn run(config: Config) -> DyndnsExitCode {
    let sync_config = config.sync_config();

    let resolver = match TraceResolver::new(&sync_config.resolver) {
        Ok(resolver) => resolver,
        Err(e) => {
            error!("{}", e);
            return DyndnsExitCode::ConfigError;
        }
    };

    let mut driver = match engine::connect(&CloudflareFactory, Box::new(resolver), &sync_config).await
    {
        Ok(driver) => driver,
        Err(e) => {
            error!("Cannot manage {}: {}", config.domain, e);
            return if e.is_fatal() {
                DyndnsExitCode::ConfigError
            } else {
                DyndnsExitCode::RuntimeError
            };
        }
    };

    match sync_config.interval_secs {
        None => run_once(&mut driver).await,
        Some(secs) => run_forever(&mut driver, Duration::from_secs(secs)).await,
    }
}

async fn run_once(driver: &mut SyncDriver) -> DyndnsExitCode {
    match driver.run_once().await {
        Ok(report) => {
            info!("DNS records up to date ({} update(s))", report.updates());
            DyndnsExitCode::Success
        }
        Err(e) => {
            error!("{}", e);
            DyndnsExitCode::RuntimeError
        }
    }
}

async fn run_forever(driver: &mut SyncDriver, interval: Duration) -> DyndnsExitCode {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(forward_shutdown(wait_for_shutdown(), shutdown_tx));

    match driver.run_with_shutdown(interval, Some(shutdown_rx)).await {
        Ok(()) => {
            info!("Shutting down daemon");
            DyndnsExitCode::Success
        }
        Err(e) => {
            error!("Daemon error: {}", e);
            DyndnsExitCode::RuntimeError
        }
    }
}

/// Fire `shutdown_tx` once `signals` reports a shutdown signal.
///
/// Without working signal handlers the daemon keeps running: the sender is
/// held forever so the loop never sees a shutdown.
async fn forward_shutdown(
    signals: impl Future<Output = Result<&'static str>>,
    shutdown_tx: oneshot::Sender<()>,
) {
    match signals.await {
        Ok(signal) => {
            info!("Received shutdown signal: {}", signal);
            let _ = shutdown_tx.send(());
        }
        Err(e) => {
            error!("Shutdown handler error: {}", e);
            std::future::pending::<()>().await;
            drop(shutdown_tx);
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
