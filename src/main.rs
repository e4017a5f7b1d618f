use std::sync::Arc;

use clap::Parser;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

use vitae::{
    config::{LogFormat, VitaeConfig},
    db::{Database, UsageRepo},
    providers::ProviderRegistry,
    quota::QuotaEnforcer,
    routes::{AppState, build_router},
    routing::{Router, ThreadRngSampler},
    service::AiService,
    settings::{RuntimeSettings, SettingsStore},
};

#[derive(Parser, Debug)]
#[command(version, about = "Vitae AI routing and usage accounting service", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the config file.
    #[arg(short, long, global = true, default_value = "vitae.toml")]
    config: String,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Apply the database schema and exit
    Migrate,
    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

const STARTER_CONFIG: &str = r#"# Vitae configuration

[server]
host = "127.0.0.1"
port = 8090

[database]
path = "vitae.db"

[providers.openai]
api_key = "${OPENAI_API_KEY}"
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"

[providers.gemini]
api_key = "${GEMINI_API_KEY}"
base_url = "https://generativelanguage.googleapis.com/v1beta"
model = "gemini-2.0-flash"
"#;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command.unwrap_or(Command::Serve) {
        Command::Init { force } => {
            if std::path::Path::new(&args.config).exists() && !force {
                eprintln!("{} already exists (use --force to overwrite)", args.config);
                std::process::exit(1);
            }
            if let Err(e) = std::fs::write(&args.config, STARTER_CONFIG) {
                eprintln!("Failed to write {}: {e}", args.config);
                std::process::exit(1);
            }
            println!("Wrote {}", args.config);
        }
        Command::Migrate => {
            let config = load_config(&args.config);
            init_tracing(&config);
            let db = connect_and_migrate(&config).await;
            drop(db);
            info!("Migrations complete");
        }
        Command::Serve => {
            let config = load_config(&args.config);
            init_tracing(&config);
            serve(config).await;
        }
    }
}

fn load_config(path: &str) -> VitaeConfig {
    match VitaeConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config from {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(config: &VitaeConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_filter));

    match config.observability.log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

async fn connect_and_migrate(config: &VitaeConfig) -> Database {
    let db = match Database::connect(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!(path = %config.database.path, error = %e, "Failed to open database");
            std::process::exit(1);
        }
    };
    if let Err(e) = db.migrate().await {
        error!(error = %e, "Failed to run migrations");
        std::process::exit(1);
    }
    db
}

async fn serve(config: VitaeConfig) {
    let db = connect_and_migrate(&config).await;
    let usage: Arc<dyn UsageRepo> = Arc::new(db.usage_repo());

    let registry = match ProviderRegistry::from_config(&config.providers) {
        Ok(registry) => registry,
        Err(e) => {
            error!(error = %e, "Provider configuration invalid");
            std::process::exit(1);
        }
    };

    let timeout = config
        .providers
        .openai
        .timeout_secs
        .max(config.providers.gemini.timeout_secs);
    let client = match reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client");
            std::process::exit(1);
        }
    };

    let settings = Arc::new(SettingsStore::new(RuntimeSettings::from_config(
        &config.quotas,
        &config.routing,
    )));
    let tracker = TaskTracker::new();

    let router = Router::new(
        registry,
        client,
        config.retry.clone(),
        config.routing.clone(),
        config.pricing.clone(),
        usage.clone(),
        settings.clone(),
        Box::new(ThreadRngSampler),
        tracker.clone(),
    );
    let quota = QuotaEnforcer::new(usage.clone(), settings.clone());
    let service = Arc::new(AiService::new(quota, router));

    let app = build_router(AppState {
        service,
        settings,
        usage,
    });

    let addr = std::net::SocketAddr::new(config.server.host, config.server.port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    info!(%addr, "Vitae listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tracker))
        .await
    {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal(tracker: TaskTracker) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining usage writes");

    tracker.close();
    match tokio::time::timeout(std::time::Duration::from_secs(30), tracker.wait()).await {
        Ok(()) => info!("All usage writes completed"),
        Err(_) => tracing::warn!("Timeout waiting for usage writes, some may be lost"),
    }
}
