use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use matutor_listings::cli::{print_help, print_version, seed_path, wants_help, wants_version};
use matutor_listings::config::Config;
use matutor_listings::handlers::AppState;
use matutor_listings::listing::ListingAssembler;
use matutor_listings::messaging::{FcmNotificationService, SmtpEmailService};
use matutor_listings::metrics::MetricsRegistry;
use matutor_listings::oracle::{create_oracle, RelevanceOracleClient};
use matutor_listings::server;
use matutor_listings::store::SqliteDocumentStore;

#[tokio::main]
async fn main() -> Result<()> {
    let args = std::env::args().collect::<Vec<_>>();
    if wants_help(&args) {
        print_help();
        return Ok(());
    }
    if wants_version(&args) {
        print_version();
        return Ok(());
    }

    let config = Config::from_env();
    let _log_guard = init_tracing(config.as_ref().ok().and_then(|c| c.log_dir.as_deref()));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting matutor-listings"
    );

    if let Err(err) = run(config, &args).await {
        error!(error = %format!("{err:#}"), "Server exited with error");
        return Err(err);
    }
    Ok(())
}

fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "matutor-listings.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}

async fn run(config: Result<Config>, args: &[String]) -> Result<()> {
    let config = config.context("Invalid configuration")?;

    let sqlite = SqliteDocumentStore::open(&config.db_path)?;
    sqlite.init()?;

    if let Some(seed) = seed_path(args)? {
        let written = sqlite.seed_from_file(&seed)?;
        info!(documents = written, seed = %seed.display(), "Seed complete");
        return Ok(());
    }

    let metrics = Arc::new(MetricsRegistry::new().context("Failed to create metrics registry")?);

    let oracle = RelevanceOracleClient::new(create_oracle(&config)?)
        .with_max_retries(config.oracle_max_retries)
        .with_metrics(Arc::clone(&metrics));

    let store = Arc::new(sqlite);
    let listings = ListingAssembler::new(store.clone(), oracle).with_metrics(Arc::clone(&metrics));

    let state = Arc::new(AppState {
        email: Arc::new(SmtpEmailService::from_config(&config)?),
        push: Arc::new(FcmNotificationService::from_config(&config)?),
        listings,
        store,
        metrics,
        config: Arc::new(config),
    });

    server::serve(Arc::clone(&state), state.config.bind_addr).await
}
