use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;

use roomrelay::config::Config;
use roomrelay::gateway::GatewayConnection;
use roomrelay::rooms::{RoomRegistry, RoomService};
use roomrelay::state::AppState;
use roomrelay::store::{MemoryStore, SessionStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomrelay=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env();
    print_banner(&config);

    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());

    // Without a broker there is nothing to relay to; fail startup.
    let gateway = match GatewayConnection::open(&config.gateway).await {
        Ok(gateway) => gateway,
        Err(e) => {
            tracing::error!("failed to reach gateway: {e}");
            std::process::exit(1);
        }
    };

    let rooms = RoomService::new(RoomRegistry::from_config(&config.registry), store.clone());

    let state = AppState {
        gateway: gateway.clone(),
        rooms,
        store: store.clone(),
    };

    let app = roomrelay::routes::router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("failed to bind");

    let actual_port = listener
        .local_addr()
        .expect("failed to get local address")
        .port();
    eprintln!("  \x1b[32m→ listening on 0.0.0.0:{actual_port}\x1b[0m");
    eprintln!();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("shutting down");
    gateway.shutdown().await;
    store.shutdown().await;
}

fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");

    eprintln!();
    eprintln!("  \x1b[1;36mroomrelay\x1b[0m \x1b[2mv{version}\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2mport\x1b[0m         {}", config.port);
    eprintln!("  \x1b[2mgateway\x1b[0m      {}", config.gateway.url);
    eprintln!("  \x1b[2mregistry\x1b[0m     {}", config.registry.base_url);
    eprintln!(
        "  \x1b[2mretries\x1b[0m      {} x {}s",
        config.gateway.connect_attempts, config.gateway.retry_delay_secs
    );
    eprintln!();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
