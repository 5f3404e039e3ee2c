use anyhow::{Context, Result};
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{fs, io::ErrorKind, path::Path, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use store_reconciler::{
    build_job,
    config::{AppConfig, Mode},
    routes, run_migrations,
    services::scheduler,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + run mode ---
    let (cfg, mode) = AppConfig::from_env_and_args()?;
    tracing::info!("Starting store-reconciler ({:?}) with config: {:?}", mode, cfg);

    // --- Initialize SQLite catalog pool ---
    let db_path = cfg
        .database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let connect_opts = SqliteConnectOptions::from_str(&cfg.database_url)
        .with_context(|| format!("parsing database url `{}`", cfg.database_url))?
        .create_if_missing(true);
    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await?,
    );

    // --- Handle migration mode ---
    if mode == Mode::Migrate {
        run_migrations(&db).await?;
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    // --- Check the bucket directory (never created here) ---
    let bucket_dir = Path::new(&cfg.storage_dir).join(&cfg.bucket);
    if !bucket_dir.is_dir() {
        tracing::warn!(
            "Bucket directory {} is missing; runs will abort until it is mounted",
            bucket_dir.display()
        );
    }

    // --- Assemble the job ---
    let job = Arc::new(build_job(&cfg, db.clone())?);

    if mode == Mode::Once {
        let outcome = job.run_reconciliation().await?;
        if let Some(summary) = outcome.summary() {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        return Ok(());
    }

    if let Some(period) = cfg.interval {
        tracing::info!("Scheduling reconciliation every {:?}", period);
        scheduler::spawn_periodic(job.clone(), period);
    }

    // --- Build router ---
    let app_state = AppState {
        db: db.clone(),
        bucket_dir,
        job,
    };
    let app: Router = routes::routes::routes().with_state(app_state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
