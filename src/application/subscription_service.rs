// Realtime subscription manager - one subscription per tracked device
use crate::application::dashboard_state::StateHandle;
use crate::application::persistence::Persistence;
use crate::application::reading_feed::ReadingFeed;
use crate::domain::device::DevAddr;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Keeps exactly one open subscription per tracked device. Changing the
/// tracked set closes every subscription before opening the new ones.
pub struct SubscriptionManager {
    feed: Arc<dyn ReadingFeed>,
    state: StateHandle,
    persistence: Persistence,
    tasks: Mutex<HashMap<DevAddr, JoinHandle<()>>>,
}

impl SubscriptionManager {
    pub fn new(feed: Arc<dyn ReadingFeed>, state: StateHandle, persistence: Persistence) -> Self {
        Self {
            feed,
            state,
            persistence,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resubscribe(&self, devices: &[DevAddr], bearer: &str) {
        let mut tasks = self.tasks.lock().await;
        close_all(&mut tasks);

        for &dev_addr in devices {
            tracing::info!("Subscribing to readings for device {}", dev_addr);
            let handle = tokio::spawn(run_subscription(
                self.feed.clone(),
                self.state.clone(),
                self.persistence.clone(),
                dev_addr,
                bearer.to_string(),
            ));
            tasks.insert(dev_addr, handle);
        }
    }

    /// Close every open subscription.
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        close_all(&mut tasks);
    }

    /// Subscriptions whose task is still running.
    pub async fn open_count(&self) -> usize {
        let tasks = self.tasks.lock().await;
        tasks.values().filter(|h| !h.is_finished()).count()
    }
}

fn close_all(tasks: &mut HashMap<DevAddr, JoinHandle<()>>) {
    for (dev_addr, handle) in tasks.drain() {
        tracing::debug!("Closing subscription for device {}", dev_addr);
        handle.abort();
    }
}

async fn run_subscription(
    feed: Arc<dyn ReadingFeed>,
    state: StateHandle,
    persistence: Persistence,
    dev_addr: DevAddr,
    bearer: String,
) {
    let mut stream = match feed.subscribe(dev_addr, &bearer).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("Subscription for device {} failed to open: {:#}", dev_addr, e);
            return;
        }
    };

    while let Some(item) = stream.next().await {
        let reading = match item {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!("Subscription for device {} stopped: {:#}", dev_addr, e);
                return;
            }
        };
        tracing::debug!("Reading for device {}: {:?}", dev_addr, reading);

        let mut guard = state.write().await;
        if !guard.apply_reading(dev_addr, reading) {
            continue;
        }
        // Saved under the guard so snapshots reach the store in mutation order
        persistence.save_history(&guard.history).await;
    }

    tracing::info!("Subscription for device {} completed", dev_addr);
}
