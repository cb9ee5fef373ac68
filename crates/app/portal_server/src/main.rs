//! Portal API server binary.
//!
//! Wires the identity store, session manager, and helpdesk adapter into the
//! HTTP router, then serves until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use portal_api::config::ApiConfig;
use portal_core::auth::directory::StaticDirectory;
use portal_core::auth::identity::IdentityStore;
use portal_core::auth::sessions::{SessionManager, SessionSweeper};
use portal_core::links::{load_links_file, seed_links_if_empty};
use portal_core::store::{MemoryStore, PgStore, Store, TicketStore};
use portal_core::tickets::{HelpdeskAuth, HelpdeskConfig, TicketService, ZammadClient};
use tracing::{info, warn};

const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;

/// CLI arguments for the portal server.
#[derive(Parser, Debug)]
#[command(name = "portal_server", about = "Business portal API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3100")]
    bind_addr: String,

    /// PostgreSQL connection URL. Required unless `--memory-store` is set.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep everything in memory. Development only; nothing survives a restart.
    #[arg(long, default_value_t = false)]
    memory_store: bool,

    /// Session and cookie lifetime, at most one year.
    #[arg(
        long,
        env = "SESSION_TTL_HOURS",
        default_value_t = 24,
        value_parser = clap::value_parser!(i64).range(1..=MAX_SESSION_TTL_HOURS)
    )]
    session_ttl_hours: i64,

    /// Seconds between expired-session sweeps.
    #[arg(
        long,
        env = "SESSION_SWEEP_INTERVAL_SECS",
        default_value_t = 3600,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    sweep_interval_secs: u64,

    /// Mark the session cookie `Secure`.
    #[arg(long, env = "COOKIE_SECURE", default_value_t = false)]
    secure_cookies: bool,

    /// Helpdesk host root; `/api/v1` is appended.
    #[arg(long, env = "ZAMMAD_URL", default_value = "http://localhost:8080")]
    zammad_url: String,

    #[arg(long, env = "ZAMMAD_API_TOKEN")]
    zammad_token: Option<String>,

    /// Basic-auth user, used when no API token is given.
    #[arg(long, env = "ZAMMAD_USER")]
    zammad_user: Option<String>,

    #[arg(long, env = "ZAMMAD_PASSWORD")]
    zammad_password: Option<String>,

    /// Helpdesk group new tickets are filed under.
    #[arg(long, env = "ZAMMAD_GROUP", default_value = "Users")]
    zammad_group: String,

    /// JSON account list for the static directory.
    #[arg(long, env = "DIRECTORY_ACCOUNTS_FILE")]
    directory_accounts: Option<PathBuf>,

    /// Directory usernames that receive the admin role.
    #[arg(
        long,
        env = "DIRECTORY_ADMINS",
        value_delimiter = ',',
        default_value = "admin"
    )]
    directory_admins: Vec<String>,

    /// Application links seeded into an empty store.
    #[arg(long, env = "APPLICATION_LINKS_FILE")]
    links_file: Option<PathBuf>,
}

impl Args {
    fn session_ttl(&self) -> Result<chrono::Duration, String> {
        chrono::Duration::try_hours(self.session_ttl_hours)
            .filter(|ttl| *ttl > chrono::Duration::zero())
            .ok_or_else(|| format!("invalid session ttl: {} hours", self.session_ttl_hours))
    }

    fn helpdesk_auth(&self) -> HelpdeskAuth {
        if let Some(token) = &self.zammad_token {
            return HelpdeskAuth::Token(token.clone());
        }
        match (&self.zammad_user, &self.zammad_password) {
            (Some(user), Some(password)) => HelpdeskAuth::Basic {
                user: user.clone(),
                password: password.clone(),
            },
            _ => {
                warn!("no helpdesk credentials configured; ticket calls will be rejected upstream");
                HelpdeskAuth::Token(String::new())
            }
        }
    }
}

async fn open_store(args: &Args) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    if args.memory_store {
        warn!("using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let Some(url) = args.database_url.as_deref() else {
        return Err("DATABASE_URL is required unless --memory-store is set".into());
    };

    info!(max_connections = args.max_connections, "configuring connection pool");
    let pool = portal_core::db::connect(url, args.max_connections).await?;

    info!("running database migrations");
    portal_core::db::migrate(&pool).await?;

    Ok(Arc::new(PgStore::new(pool)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("info,portal_api=debug,portal_core=debug")
                }),
        )
        .init();

    let args = Args::parse();
    info!(version = portal_core::version(), bind_addr = %args.bind_addr, "starting portal_server");

    let store = open_store(&args).await?;

    if let Some(path) = &args.links_file {
        let seeded = seed_links_if_empty(store.as_ref(), load_links_file(path)?).await?;
        info!(seeded, path = %path.display(), "application links loaded");
    }

    let directory = match &args.directory_accounts {
        Some(path) => StaticDirectory::from_file(path)?,
        None => {
            warn!("no directory accounts configured; employee login is disabled");
            StaticDirectory::default()
        }
    };
    info!(accounts = directory.len(), "directory ready");

    let zammad = Arc::new(ZammadClient::new(HelpdeskConfig {
        base_url: args.zammad_url.clone(),
        auth: args.helpdesk_auth(),
        group: args.zammad_group.clone(),
    })?);

    let config = ApiConfig {
        bind_addr: args.bind_addr.clone(),
        session_ttl: args.session_ttl()?,
        secure_cookies: args.secure_cookies,
    };

    let ticket_store: Arc<dyn TicketStore> = store.clone();
    let sessions = SessionManager::new(store.clone());
    let state = portal_api::AppState {
        config: config.clone(),
        store: store.clone(),
        identities: IdentityStore::new(store.clone(), Arc::new(directory))
            .with_customer_authority(zammad.clone())
            .with_directory_admins(args.directory_admins.clone()),
        sessions: sessions.clone(),
        tickets: TicketService::new(ticket_store, zammad),
    };

    let sweeper = SessionSweeper::start(sessions, Duration::from_secs(args.sweep_interval_secs))?;

    let app = portal_api::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.stop().await;
    result?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
