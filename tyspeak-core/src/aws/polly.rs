//! AWS Polly text-to-speech implementation

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_polly::types::{OutputFormat, VoiceId};
use aws_sdk_polly::Client;
use tracing::debug;

use crate::pipeline::provider::Synthesizer;
use crate::pipeline::types::{AudioStream, SAMPLE_RATE};

use super::service_error;

/// AWS Polly text-to-speech provider
pub struct PollySynthesizer {
    client: Client,
}

impl PollySynthesizer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Synthesizer for PollySynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioStream> {
        // Unknown voices become VoiceId::Unknown and are rejected by Polly
        let response = self
            .client
            .synthesize_speech()
            .text(text)
            .voice_id(VoiceId::from(voice))
            .output_format(OutputFormat::Mp3)
            .sample_rate(SAMPLE_RATE)
            .send()
            .await
            .map_err(service_error)?;

        debug!(
            content_type = ?response.content_type,
            characters = response.request_characters,
            "Polly synthesis started"
        );

        let content_type = response.content_type.clone();
        Ok(AudioStream::new(response.audio_stream).with_content_type(content_type))
    }
}
