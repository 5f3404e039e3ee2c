use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub store_endpoint: String,
    pub bucket: String,
    pub prefix: String,
    pub legacy_locations: Vec<String>,
    pub interval: Option<Duration>,
    pub webhook_url: Option<String>,
    pub webhook_timeout: Duration,
    pub dry_run: bool,
}

/// What the binary should do after loading config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Serve,
    Migrate,
    Once,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Object store / metadata catalog reconciler")]
pub struct Args {
    /// Host to bind to (overrides RECONCILER_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides RECONCILER_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding the object store buckets (overrides RECONCILER_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Catalog database URL (overrides RECONCILER_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Public endpoint embedded in catalog URLs (overrides RECONCILER_STORE_ENDPOINT)
    #[arg(long)]
    pub store_endpoint: Option<String>,

    /// Bucket to reconcile (overrides RECONCILER_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Key prefix to list (overrides RECONCILER_PREFIX)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Comma-separated `endpoint/bucket` locations older rows may use
    /// (overrides RECONCILER_LEGACY_LOCATIONS)
    #[arg(long)]
    pub legacy_locations: Option<String>,

    /// Seconds between scheduled runs, 0 disables the ticker
    /// (overrides RECONCILER_INTERVAL_SECS)
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Webhook receiving deletion events (overrides RECONCILER_WEBHOOK_URL)
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Log repairs without applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Run migrations and exit
    #[arg(long, conflicts_with = "once")]
    pub migrate: bool,

    /// Run a single reconciliation and exit
    #[arg(long)]
    pub once: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and run mode.
    pub fn from_env_and_args() -> Result<(Self, Mode)> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<(Self, Mode)> {
        // --- Environment fallback ---
        let env_host = env::var("RECONCILER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_parse("RECONCILER_PORT", 3000u16)?;
        let env_storage =
            env::var("RECONCILER_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_db = env::var("RECONCILER_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/catalog.db".into());
        let env_endpoint = env::var("RECONCILER_STORE_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:9000".into());
        let env_bucket = env::var("RECONCILER_BUCKET").unwrap_or_else(|_| "uploads".into());
        let env_prefix = env::var("RECONCILER_PREFIX").unwrap_or_else(|_| "files/".into());
        let env_legacy = env::var("RECONCILER_LEGACY_LOCATIONS").ok();
        let env_interval = env_parse("RECONCILER_INTERVAL_SECS", 3600u64)?;
        let env_webhook = env::var("RECONCILER_WEBHOOK_URL").ok();
        let webhook_timeout_secs = env_parse("RECONCILER_WEBHOOK_TIMEOUT_SECS", 5u64)?;

        // --- Merge ---
        let interval_secs = args.interval_secs.unwrap_or(env_interval);
        let legacy = args.legacy_locations.or(env_legacy).unwrap_or_default();
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            store_endpoint: args.store_endpoint.unwrap_or(env_endpoint),
            bucket: args.bucket.unwrap_or(env_bucket),
            prefix: args.prefix.unwrap_or(env_prefix),
            legacy_locations: split_list(&legacy),
            interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
            webhook_url: args.webhook_url.or(env_webhook).filter(|u| !u.is_empty()),
            webhook_timeout: Duration::from_secs(webhook_timeout_secs),
            dry_run: args.dry_run,
        };

        let mode = if args.migrate {
            Mode::Migrate
        } else if args.once {
            Mode::Once
        } else {
            Mode::Serve
        };

        Ok((cfg, mode))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
