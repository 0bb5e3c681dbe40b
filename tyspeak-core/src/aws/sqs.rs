use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_sqs::Client;

use crate::pipeline::provider::Publisher;
use crate::pipeline::types::PublishReceipt;

use super::service_error;

/// Sends the artifact key as a plain SQS message body, no attributes.
pub struct SqsPublisher {
    client: Client,
}

impl SqsPublisher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Publisher for SqsPublisher {
    async fn publish(&self, queue_url: &str, body: &str) -> Result<PublishReceipt> {
        let output = self
            .client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(service_error)?;

        Ok(PublishReceipt {
            message_id: output.message_id().map(str::to_string),
        })
    }
}
