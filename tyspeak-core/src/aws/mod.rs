//! AWS-backed pipeline steps: Polly for synthesis, S3 for storage and SQS
//! for notifications.

pub mod polly;
pub mod s3;
pub mod sqs;

use std::sync::Arc;

use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_polly::config::Region;
use aws_smithy_types::error::display::DisplayErrorContext;

use crate::pipeline::handler::SpeechHandler;
use crate::pipeline::identity::UlidGenerator;
use crate::settings::{AwsSettings, RelayConfig};

pub use polly::PollySynthesizer;
pub use s3::S3Uploader;
pub use sqs::SqsPublisher;

/// Load the shared SDK configuration. Credentials come from the default
/// provider chain of the hosting environment.
pub async fn load_sdk_config(settings: &AwsSettings) -> SdkConfig {
    let mut aws_config_loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(profile) = &settings.profile {
        aws_config_loader = aws_config_loader.profile_name(profile);
    }

    if let Some(region) = &settings.region {
        aws_config_loader = aws_config_loader.region(Region::new(region.clone()));
    }

    aws_config_loader.load().await
}

/// Wire a handler to real AWS services. All three clients share one
/// `SdkConfig`.
pub async fn build_handler(config: RelayConfig) -> SpeechHandler {
    let sdk_config = load_sdk_config(&config.aws).await;
    tracing::info!(
        region = ?sdk_config.region(),
        bucket = %config.bucket_name,
        queue_url = %config.queue_url,
        "AWS clients configured"
    );

    SpeechHandler::new(
        config,
        Arc::new(UlidGenerator::new()),
        Arc::new(PollySynthesizer::new(aws_sdk_polly::Client::new(&sdk_config))),
        Arc::new(S3Uploader::new(aws_sdk_s3::Client::new(&sdk_config))),
        Arc::new(SqsPublisher::new(aws_sdk_sqs::Client::new(&sdk_config))),
    )
}

/// Flatten an SDK error into the service's own message (error code and
/// text), without adding context of our own.
pub(crate) fn service_error<E>(err: E) -> anyhow::Error
where
    E: std::error::Error,
{
    anyhow::anyhow!("{}", DisplayErrorContext(err))
}
