use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::connection::GatewayConnection;
use super::error::GatewayError;

/// Spawn the health poller for socket `generation`.
pub(super) fn spawn(conn: GatewayConnection, generation: u64) -> JoinHandle<()> {
    tokio::spawn(run(conn, generation))
}

async fn run(conn: GatewayConnection, generation: u64) {
    let cancel = conn.cancel_token();
    let mut ticker = tokio::time::interval(conn.watchdog_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }
        let (current, alive) = conn.health().await;
        if current != generation {
            tracing::debug!("watchdog for generation {generation} superseded by {current}");
            return;
        }
        if !alive {
            break;
        }
    }

    tracing::warn!("gateway socket (generation {generation}) closed, reconnecting");
    loop {
        match conn.reconnect_from(generation).await {
            // The successful connect spawned our replacement.
            Ok(()) => return,
            Err(GatewayError::ShuttingDown) => return,
            Err(e) => {
                tracing::error!("watchdog reconnect failed: {e}");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(conn.retry_delay()) => {}
                }
            }
        }
    }
}
