use super::connection::GatewayConnection;
use super::error::GatewayError;
use super::events::OutboundEvent;

impl GatewayConnection {
    /// Encode `event` and write it as one binary frame.
    ///
    /// A failed write (or a missing socket) gets exactly one reconnect and
    /// one more write. Nothing is queued: if that second write fails too the
    /// error goes back to the caller.
    pub async fn send(&self, event: OutboundEvent) -> Result<(), GatewayError> {
        let payload = event.encode()?;

        let seen = match self.write(payload.clone()).await {
            Ok(()) => return Ok(()),
            Err(failure) => {
                tracing::warn!(
                    "gateway write failed for room {}: {}, reconnecting",
                    event.room_id,
                    failure.error
                );
                failure.generation
            }
        };

        self.reconnect_from(seen).await?;
        self.write(payload).await.map_err(|failure| {
            tracing::error!(
                "gateway write failed again for room {}: {}",
                event.room_id,
                failure.error
            );
            GatewayError::SendFailed(failure.error)
        })
    }
}
