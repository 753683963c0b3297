//! `LISTEN` tasks feeding the [`EventHub`].

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::event::{BridgeEvent, Feed};
use super::hub::EventHub;

/// Wait between reconnection attempts after a listener fails.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Starts the change-feed listeners.
pub struct RealtimeBridge;

impl RealtimeBridge {
    /// Open one listener per feed and republish notifications to `hub`.
    ///
    /// Must be called from within a Tokio runtime. Listeners reconnect on
    /// their own until the returned handle is dropped or unsubscribed.
    #[must_use = "dropping the handle immediately closes every listener"]
    pub fn start(pool: PgPool, hub: EventHub) -> BridgeHandle {
        let tasks = Feed::ALL
            .into_iter()
            .map(|feed| tokio::spawn(listen_forever(pool.clone(), hub.clone(), feed)))
            .collect();

        info!(feeds = Feed::ALL.len(), "Realtime bridge started");
        BridgeHandle { tasks }
    }
}

/// Owns the listener tasks. Closing it stops every subscription.
pub struct BridgeHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl BridgeHandle {
    /// Close every subscription.
    pub fn unsubscribe(mut self) {
        self.abort_all();
        info!("Realtime bridge unsubscribed");
    }

    /// Whether any listener task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    fn abort_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        self.abort_all();
    }
}

async fn listen_forever(pool: PgPool, hub: EventHub, feed: Feed) {
    loop {
        match listen(&pool, &hub, feed).await {
            Ok(()) => debug!(%feed, "Listener stream ended"),
            Err(e) => warn!(%feed, error = %e, "Listener failed, reconnecting"),
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

#[instrument(skip(pool, hub))]
async fn listen(pool: &PgPool, hub: &EventHub, feed: Feed) -> Result<(), sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(feed.channel()).await?;
    debug!(channel = feed.channel(), "Listening");

    while let Some(notification) = listener.try_recv().await? {
        match BridgeEvent::from_notification(feed, notification.payload()) {
            Ok(event) => {
                hub.publish(event);
            }
            Err(e) => warn!(error = %e, "Ignoring malformed change notification"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use sqlx::postgres::PgPoolOptions;

    use super::*;

    #[tokio::test]
    async fn test_unsubscribe_stops_listeners() {
        // Never actually connects: listeners sit in their retry loop.
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(50))
            .connect_lazy("postgres://soko@127.0.0.1:1/soko")
            .expect("lazy pool");

        let handle = RealtimeBridge::start(pool, EventHub::new());
        assert!(handle.is_active());
        handle.unsubscribe();
    }

    #[tokio::test]
    async fn test_drop_aborts_tasks() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://soko@127.0.0.1:1/soko")
            .expect("lazy pool");

        let handle = RealtimeBridge::start(pool, EventHub::new());
        let tasks: Vec<_> = handle.tasks.iter().map(JoinHandle::abort_handle).collect();
        drop(handle);
        tokio::task::yield_now().await;

        for task in tasks {
            // Aborted tasks report finished once the runtime has processed the abort.
            for _ in 0..10 {
                if task.is_finished() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            assert!(task.is_finished());
        }
    }
}
