//! ==============================================================================
//! relay.rs - fan-out of sensor lines to connected viewers
//! ==============================================================================
//!
//! purpose:
//!     every line the sensor produces is pushed, unmodified, to every viewer
//!     that is subscribed at that moment.
//!
//! delivery:
//!     - best effort: a subscriber that falls behind skips what it missed
//!     - no replay: a new subscriber only sees lines published after it joined
//!     - one logical stream, so every subscriber sees lines in reader order
//!
//! relationships:
//!     - fed by: sensor.rs (via `pump`)
//!     - used by: server.rs (one subscription per push connection)
//!
//! ==============================================================================

use crate::error::SensorError;

use futures::{Stream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Publish side of the relay. Cheap to clone; all clones share one channel.
#[derive(Clone)]
pub struct BroadcastRelay {
    tx: broadcast::Sender<String>,
    lines_relayed: Arc<AtomicU64>,
}

impl BroadcastRelay {
    /// `capacity` is how many lines a slow subscriber may fall behind by.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, lines_relayed: Arc::new(AtomicU64::new(0)) }
    }

    /// Push a line to everyone currently subscribed. Returns how many
    /// subscribers it was handed to (zero is not an error).
    pub fn publish(&self, line: String) -> usize {
        self.lines_relayed.fetch_add(1, Ordering::Relaxed);
        self.tx.send(line).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription { rx: self.tx.subscribe() }
    }

    /// Currently connected subscribers.
    pub fn viewer_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn lines_relayed(&self) -> u64 {
        self.lines_relayed.load(Ordering::Relaxed)
    }
}

/// One viewer's view of the relay. Dropping it leaves the relay.
pub struct Subscription {
    rx: broadcast::Receiver<String>,
}

impl Subscription {
    /// Next line, or `None` once the relay itself is gone.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(line) => return Some(line),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "viewer fell behind the relay, lines dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = String> {
        futures::stream::unfold(self, |mut sub| async move {
            let line = sub.recv().await?;
            Some((line, sub))
        })
    }
}

/// Forward every line from the reader into the relay until the reader ends.
///
/// Returns the error that ended the reader, if any. Never retries: the
/// sensor stream is not restartable.
pub async fn pump<S>(lines: S, relay: BroadcastRelay, show_sensor_data: bool) -> Result<(), SensorError>
where
    S: Stream<Item = Result<String, SensorError>>,
{
    futures::pin_mut!(lines);
    while let Some(line) = lines.next().await {
        let line = line?;
        if show_sensor_data {
            tracing::info!(target: "sensor", "{}", line);
        } else {
            tracing::debug!(target: "sensor", "{}", line);
        }
        let delivered = relay.publish(line);
        tracing::trace!(delivered, "line relayed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::SensorLineReader;
    use std::time::Duration;

    #[tokio::test]
    async fn test_every_subscriber_gets_every_line_in_order() {
        let relay = BroadcastRelay::new(16);
        let mut a = relay.subscribe();
        let mut b = relay.subscribe();

        assert_eq!(relay.publish("Turbidity: 1".to_string()), 2);
        assert_eq!(relay.publish("Turbidity: 2".to_string()), 2);

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.recv().await.as_deref(), Some("Turbidity: 1"));
            assert_eq!(sub.recv().await.as_deref(), Some("Turbidity: 2"));
        }
        assert_eq!(relay.lines_relayed(), 2);
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_no_backfill() {
        let relay = BroadcastRelay::new(16);
        assert_eq!(relay.publish("early".to_string()), 0);

        let mut late = relay.subscribe();
        relay.publish("after".to_string());
        assert_eq!(late.recv().await.as_deref(), Some("after"));
    }

    #[tokio::test]
    async fn test_viewer_count_follows_joins_and_leaves() {
        let relay = BroadcastRelay::new(4);
        assert_eq!(relay.viewer_count(), 0);
        let a = relay.subscribe();
        let b = relay.subscribe();
        assert_eq!(relay.viewer_count(), 2);
        drop(a);
        assert_eq!(relay.viewer_count(), 1);
        drop(b);
        assert_eq!(relay.viewer_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_skips_and_continues() {
        let relay = BroadcastRelay::new(2);
        let mut slow = relay.subscribe();
        for i in 0..5 {
            relay.publish(format!("{i}"));
        }
        // only the newest lines fit in the buffer
        assert_eq!(slow.recv().await.as_deref(), Some("3"));
        assert_eq!(slow.recv().await.as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn test_subscription_ends_when_relay_is_gone() {
        let relay = BroadcastRelay::new(2);
        let mut sub = relay.subscribe();
        drop(relay);
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_pump_relays_reader_output() {
        let relay = BroadcastRelay::new(16);
        let sub = relay.subscribe();
        let input: &[u8] = b"Turbidity: 641\r\ngarbage\n";
        let lines = SensorLineReader::from_reader(input).into_lines();

        pump(lines, relay.clone(), false).await.unwrap();
        drop(relay);

        let received: Vec<String> = tokio::time::timeout(Duration::from_secs(1), sub.into_stream().collect())
            .await
            .unwrap();
        assert_eq!(received, vec!["Turbidity: 641".to_string(), "garbage".to_string()]);
    }

    #[tokio::test]
    async fn test_pump_surfaces_read_errors() {
        let relay = BroadcastRelay::new(4);
        let lines = futures::stream::iter(vec![
            Ok("1".to_string()),
            Err(SensorError::Read(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"))),
            Ok("2".to_string()),
        ]);
        let err = pump(lines, relay.clone(), true).await.unwrap_err();
        assert!(matches!(err, SensorError::Read(_)));
        assert_eq!(relay.lines_relayed(), 1);
    }
}
