// Port for the local persistent key-value store
use async_trait::async_trait;

/// Named slots holding serialized values. Contents are untrusted: anything
/// may have been written to a slot since the last run.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}
