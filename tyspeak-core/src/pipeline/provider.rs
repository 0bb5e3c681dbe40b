use anyhow::Result;
use async_trait::async_trait;

use super::types::{ArtifactId, AudioStream, PublishReceipt, UploadReceipt};

/// Source of artifact ids
pub trait IdGenerator: Send + Sync {
    /// Produce an id that has not been handed out before
    fn next_id(&self) -> Result<ArtifactId>;
}

/// Trait for text-to-speech services
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` with `voice`. The voice id is passed through as-is;
    /// the service decides whether it is valid.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioStream>;
}

/// Trait for object stores
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    /// Store the full contents of `body` under `key`, consuming the stream.
    async fn upload(&self, bucket: &str, key: &str, body: AudioStream) -> Result<UploadReceipt>;
}

/// Trait for notification queues
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, queue_url: &str, body: &str) -> Result<PublishReceipt>;
}
