use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::settings::RelayConfig;

use super::handler::SpeechHandler;
use super::identity::UlidGenerator;
use super::provider::{IdGenerator, ObjectUploader, Publisher, Synthesizer};
use super::types::{
    ArtifactId, AudioStream, PublishReceipt, SpeechRequest, UploadReceipt, CONTENT_TYPE,
};

/// Mock behavior shared by every mock step
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MockBehavior {
    /// Behave like a healthy service
    #[default]
    Success,
    /// Fail every call with the given service message
    Fail { message: String },
}

impl MockBehavior {
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail {
            message: message.into(),
        }
    }

    fn check(&self) -> Result<()> {
        match self {
            Self::Success => Ok(()),
            Self::Fail { message } => bail!("{message}"),
        }
    }
}

/// Id generator that records every id it hands out
#[derive(Clone, Default)]
pub struct MockIdGenerator {
    behavior: MockBehavior,
    inner: Arc<UlidGenerator>,
    issued: Arc<Mutex<Vec<ArtifactId>>>,
}

impl MockIdGenerator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    pub fn issued(&self) -> Vec<ArtifactId> {
        self.issued.lock().unwrap().clone()
    }
}

impl IdGenerator for MockIdGenerator {
    fn next_id(&self) -> Result<ArtifactId> {
        self.behavior.check()?;
        let id = self.inner.next_id()?;
        self.issued.lock().unwrap().push(id);
        Ok(id)
    }
}

/// Synthesizer returning a fixed audio payload
#[derive(Clone)]
pub struct MockSynthesizer {
    behavior: MockBehavior,
    audio: Vec<u8>,
    calls: Arc<Mutex<Vec<SpeechRequest>>>,
}

impl MockSynthesizer {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            audio: b"ID3\x04\x00mock-mp3-frames".to_vec(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_audio(mut self, audio: Vec<u8>) -> Self {
        self.audio = audio;
        self
    }

    pub fn audio(&self) -> &[u8] {
        &self.audio
    }

    pub fn calls(&self) -> Vec<SpeechRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioStream> {
        self.calls
            .lock()
            .unwrap()
            .push(SpeechRequest::new(text, voice));
        self.behavior.check()?;
        Ok(AudioStream::from_bytes(self.audio.clone())
            .with_content_type(Some(CONTENT_TYPE.to_string())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
}

/// Object store that keeps uploads in memory. A failing uploader still
/// records the attempt, with whatever it read before failing.
#[derive(Clone, Default)]
pub struct MockUploader {
    behavior: MockBehavior,
    uploads: Arc<Mutex<Vec<StoredObject>>>,
}

impl MockUploader {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            uploads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn uploads(&self) -> Vec<StoredObject> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectUploader for MockUploader {
    async fn upload(&self, bucket: &str, key: &str, body: AudioStream) -> Result<UploadReceipt> {
        let body = body.collect().await?;
        let bytes = body.len() as u64;
        self.uploads.lock().unwrap().push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
        });
        self.behavior.check()?;
        Ok(UploadReceipt {
            location: format!("mock://{bucket}/{key}"),
            e_tag: None,
            bytes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub queue_url: String,
    pub body: String,
}

/// Queue that records every message
#[derive(Clone, Default)]
pub struct MockPublisher {
    behavior: MockBehavior,
    messages: Arc<Mutex<Vec<PublishedMessage>>>,
}

impl MockPublisher {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, queue_url: &str, body: &str) -> Result<PublishReceipt> {
        self.messages.lock().unwrap().push(PublishedMessage {
            queue_url: queue_url.to_string(),
            body: body.to_string(),
        });
        self.behavior.check()?;
        let count = self.messages.lock().unwrap().len();
        Ok(PublishReceipt {
            message_id: Some(format!("mock-message-{count}")),
        })
    }
}

/// One mock per pipeline step, sharing their recordings with the handler
/// built from them.
#[derive(Clone)]
pub struct MockServices {
    pub ids: MockIdGenerator,
    pub synthesizer: MockSynthesizer,
    pub uploader: MockUploader,
    pub publisher: MockPublisher,
}

impl Default for MockServices {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServices {
    pub fn new() -> Self {
        Self {
            ids: MockIdGenerator::new(MockBehavior::Success),
            synthesizer: MockSynthesizer::new(MockBehavior::Success),
            uploader: MockUploader::new(MockBehavior::Success),
            publisher: MockPublisher::new(MockBehavior::Success),
        }
    }

    pub fn handler(&self, config: RelayConfig) -> SpeechHandler {
        SpeechHandler::new(
            config,
            Arc::new(self.ids.clone()),
            Arc::new(self.synthesizer.clone()),
            Arc::new(self.uploader.clone()),
            Arc::new(self.publisher.clone()),
        )
    }
}
