use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::settings::RelayConfig;

use super::provider::{IdGenerator, ObjectUploader, Publisher, Synthesizer};
use super::types::{SpeechRequest, SpeechResponse};

/// Progress of one request through the pipeline. Stages only move forward;
/// any error jumps to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Init,
    IdentityGenerated,
    Synthesized,
    Uploaded,
    Published,
    Done,
    Failed,
}

/// Runs the id -> synthesize -> upload -> publish chain for one request at a
/// time. Holds no per-request state, so one handler serves every invocation
/// of a process.
#[derive(Clone)]
pub struct SpeechHandler {
    config: Arc<RelayConfig>,
    id_generator: Arc<dyn IdGenerator>,
    synthesizer: Arc<dyn Synthesizer>,
    uploader: Arc<dyn ObjectUploader>,
    publisher: Arc<dyn Publisher>,
}

impl SpeechHandler {
    pub fn new(
        config: RelayConfig,
        id_generator: Arc<dyn IdGenerator>,
        synthesizer: Arc<dyn Synthesizer>,
        uploader: Arc<dyn ObjectUploader>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            id_generator,
            synthesizer,
            uploader,
            publisher,
        }
    }

    /// Handle one invocation. On error the host should report
    /// `SpeechResponse::failure()` together with the error.
    pub async fn handle(&self, request: SpeechRequest) -> Result<SpeechResponse, RelayError> {
        info!(
            voice = %request.voice,
            text_len = request.text.len(),
            "Handling speech request"
        );

        let result = self.run(&request).await;
        match &result {
            Ok(response) => info!(file_name = %response.file_name, "Speech request complete"),
            Err(e) => warn!(
                stage = %Stage::Failed,
                failed_after = %e.failed_after(),
                kind = %e.kind(),
                "Speech request failed: {e}"
            ),
        }
        result
    }

    async fn run(&self, request: &SpeechRequest) -> Result<SpeechResponse, RelayError> {
        debug!(stage = %Stage::Init);

        let id = self
            .id_generator
            .next_id()
            .map_err(RelayError::IdentityGeneration)?;
        debug!(stage = %Stage::IdentityGenerated, %id);

        let audio = self
            .synthesizer
            .synthesize(&request.text, &request.voice)
            .await
            .map_err(RelayError::Synthesis)?;
        debug!(
            stage = %Stage::Synthesized,
            content_type = audio.content_type().unwrap_or("unknown")
        );

        // The key is both the object name and the notification body
        let key = id.object_key();
        let receipt = self
            .uploader
            .upload(&self.config.bucket_name, &key, audio)
            .await
            .map_err(RelayError::Upload)?;
        debug!(
            stage = %Stage::Uploaded,
            location = %receipt.location,
            bytes = receipt.bytes
        );

        let receipt = self
            .publisher
            .publish(&self.config.queue_url, &key)
            .await
            .map_err(RelayError::Publish)?;
        debug!(stage = %Stage::Published, message_id = ?receipt.message_id);

        debug!(stage = %Stage::Done);
        Ok(SpeechResponse::stored(&id))
    }
}
