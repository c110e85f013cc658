use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cuepulse::application::{ActionExecutor, RoundSource};
use cuepulse::domain::ConnectionRef;
use cuepulse::infrastructure::{
    console_executor::ConsoleActionExecutor,
    engine::{EngineOptions, TriggerEngine},
    http_executor::HttpActionExecutor,
    round_source::SharedRoundSource,
};
use cuepulse::interfaces::config::Config;
use cuepulse::interfaces::http_api::{build_router, ApiState};

#[derive(Parser, Debug)]
#[command(name = "cuepulse")]
struct Args {
    /// Path to config.yaml
    #[arg(long, default_value = "config.yaml")]
    config: String,

    /// Do not call the broadcast bridge (print actions to console)
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("cuepulse=info".parse().unwrap()),
        )
        .init();
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env"));
    }
    let args = Args::parse();

    // 1) load config
    let cfg = match Config::load_from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    let rules = match cfg.to_rules() {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Invalid rules in config: {e}");
            std::process::exit(1);
        }
    };

    // 2) build infra
    let executor: Arc<dyn ActionExecutor> = if args.dry_run {
        tracing::warn!("--dry-run enabled: actions go to console only");
        Arc::new(ConsoleActionExecutor::new())
    } else {
        let default_connection = ConnectionRef(cfg.default_connection.clone());
        match HttpActionExecutor::new(cfg.connection_urls(), default_connection) {
            Ok(exec) => Arc::new(exec),
            Err(e) => {
                tracing::error!("Invalid connection config: {e}");
                std::process::exit(1);
            }
        }
    };

    let rounds = SharedRoundSource::new();

    // 3) engine
    let mut options = EngineOptions {
        rules,
        ..Default::default()
    };
    if let Some(capacity) = cfg.log_capacity {
        options.log_capacity = capacity;
    }
    if let Some(depth) = cfg.queue_depth {
        options.queue_depth = depth;
    }

    let engine = match TriggerEngine::spawn(
        executor,
        Arc::new(rounds.clone()) as Arc<dyn RoundSource>,
        options,
    ) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Failed to start engine: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        rules = engine.list_rules().len(),
        addr = %cfg.listen_addr,
        "engine started"
    );

    // 4) serve authoring/ingest API
    let state = ApiState {
        engine,
        rounds,
        api_token: cfg.api_token.clone(),
    };
    let router = build_router(state);

    let listener = match tokio::net::TcpListener::bind(&cfg.listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", cfg.listen_addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, router).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}
