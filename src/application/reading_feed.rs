// Port for the realtime graph backend
use crate::domain::device::DevAddr;
use crate::domain::reading::SensorReading;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Readings pushed for one device. Ends when the backend completes the
/// subscription; dropping it closes the subscription.
pub type ReadingStream = BoxStream<'static, anyhow::Result<SensorReading>>;

#[async_trait]
pub trait ReadingFeed: Send + Sync {
    /// Open a realtime subscription for `dev_addr`, authorized by `bearer`.
    async fn subscribe(&self, dev_addr: DevAddr, bearer: &str) -> anyhow::Result<ReadingStream>;
}
