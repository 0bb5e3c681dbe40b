//! S3 object store implementation

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use tracing::{debug, warn};

use crate::pipeline::provider::ObjectUploader;
use crate::pipeline::types::{AudioStream, UploadReceipt, CONTENT_TYPE};

use super::service_error;

/// Smallest part size S3 accepts for every part but the last.
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Streams audio into S3. Short payloads go up with one `PutObject`; anything
/// larger than a part is sent as a multipart upload, so the stream never has
/// to be held in memory in full.
pub struct S3Uploader {
    client: Client,
    part_size: usize,
}

impl S3Uploader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            part_size: MIN_PART_SIZE,
        }
    }

    /// Values below the S3 minimum are raised to it.
    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size.max(MIN_PART_SIZE);
        self
    }

    async fn put_single(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<UploadReceipt> {
        let bytes = body.len() as u64;
        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(service_error)?;

        Ok(UploadReceipt {
            location: format!("s3://{bucket}/{key}"),
            e_tag: output.e_tag().map(str::to_string),
            bytes,
        })
    }

    async fn put_multipart(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: AudioStream,
        first_part: Vec<u8>,
    ) -> Result<UploadReceipt> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(service_error)?;
        let upload_id = created
            .upload_id()
            .context("S3 did not return a multipart upload id")?
            .to_string();

        match self
            .upload_parts(bucket, key, &upload_id, body, first_part)
            .await
        {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                // Drop the stored parts; the object itself never became visible
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(
                        upload_id = %upload_id,
                        "Failed to abort multipart upload: {}",
                        service_error(abort_err)
                    );
                }
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        mut body: AudioStream,
        mut buffer: Vec<u8>,
    ) -> Result<UploadReceipt> {
        let mut completed = Vec::new();
        let mut total: u64 = 0;
        let mut part_number: i32 = 1;
        let mut exhausted = false;

        loop {
            if !buffer.is_empty() {
                total += buffer.len() as u64;
                let part = std::mem::take(&mut buffer);
                let output = self
                    .client
                    .upload_part()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(upload_id)
                    .part_number(part_number)
                    .body(ByteStream::from(part))
                    .send()
                    .await
                    .map_err(service_error)?;
                debug!(part_number, total, "Uploaded audio part");

                completed.push(
                    CompletedPart::builder()
                        .part_number(part_number)
                        .set_e_tag(output.e_tag().map(str::to_string))
                        .build(),
                );
                part_number += 1;
            }

            if exhausted {
                break;
            }

            buffer.reserve(self.part_size);
            exhausted = body.fill(&mut buffer, self.part_size).await?;
        }

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await
            .map_err(service_error)?;

        Ok(UploadReceipt {
            location: format!("s3://{bucket}/{key}"),
            e_tag: output.e_tag().map(str::to_string),
            bytes: total,
        })
    }
}

#[async_trait]
impl ObjectUploader for S3Uploader {
    async fn upload(&self, bucket: &str, key: &str, mut body: AudioStream) -> Result<UploadReceipt> {
        let content_type = body.content_type().unwrap_or(CONTENT_TYPE).to_string();

        let mut buffer = Vec::with_capacity(self.part_size);
        let exhausted = body.fill(&mut buffer, self.part_size).await?;

        if exhausted {
            debug!(bytes = buffer.len(), "Uploading audio as a single object");
            return self.put_single(bucket, key, &content_type, buffer).await;
        }

        debug!("Audio exceeds one part, switching to multipart upload");
        self.put_multipart(bucket, key, &content_type, body, buffer)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use aws_sdk_s3::config::{
        BehaviorVersion, Credentials, Region, RequestChecksumCalculation,
        StalledStreamProtectionConfig,
    };
    use aws_smithy_http_client::test_util::infallible_client_fn;
    use aws_smithy_types::body::SdkBody;
    use aws_smithy_types::retry::RetryConfig;

    const BUCKET: &str = "tts-audio";
    const KEY: &str = "01ARZ3NDEKTSV4RRFFQ69G5FAV.mp3";

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Put { content_type: Option<String>, body: Vec<u8> },
        Create,
        Part { number: i32, body: Vec<u8> },
        Complete { parts: usize },
        Abort,
    }

    /// In-memory S3 endpoint that records every call it answers.
    #[derive(Clone, Default)]
    struct FakeS3 {
        calls: Arc<Mutex<Vec<Call>>>,
        fail_part: Option<i32>,
    }

    impl FakeS3 {
        fn failing_part(number: i32) -> Self {
            Self {
                fail_part: Some(number),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn part_sizes(&self) -> Vec<usize> {
            self.calls()
                .iter()
                .filter_map(|call| match call {
                    Call::Part { body, .. } => Some(body.len()),
                    _ => None,
                })
                .collect()
        }

        fn uploaded_bytes(&self) -> Vec<u8> {
            self.calls()
                .into_iter()
                .flat_map(|call| match call {
                    Call::Put { body, .. } | Call::Part { body, .. } => body,
                    _ => Vec::new(),
                })
                .collect()
        }

        fn answer(&self, req: http::Request<SdkBody>) -> http::Response<SdkBody> {
            let query = req.uri().query().unwrap_or_default().to_string();
            let body = req.body().bytes().unwrap_or_default().to_vec();
            let part_number = query
                .split('&')
                .find_map(|pair| pair.strip_prefix("partNumber="))
                .and_then(|n| n.parse::<i32>().ok());

            let (call, response) = match (req.method().as_str(), part_number) {
                ("PUT", Some(number)) => {
                    let call = Call::Part { number, body };
                    if self.fail_part == Some(number) {
                        (call, access_denied())
                    } else {
                        (call, ok_with_etag(&format!("\"part-{number}\"")))
                    }
                }
                ("PUT", None) => {
                    let content_type = req
                        .headers()
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    (Call::Put { content_type, body }, ok_with_etag("\"single\""))
                }
                ("POST", _) if query.contains("uploads") => (
                    Call::Create,
                    xml(format!(
                        "<InitiateMultipartUploadResult><Bucket>{BUCKET}</Bucket>\
                         <Key>{KEY}</Key><UploadId>upload-1</UploadId>\
                         </InitiateMultipartUploadResult>"
                    )),
                ),
                ("POST", _) => {
                    let parts = String::from_utf8_lossy(&body).matches("<Part>").count();
                    (
                        Call::Complete { parts },
                        xml(format!(
                            "<CompleteMultipartUploadResult><Bucket>{BUCKET}</Bucket>\
                             <Key>{KEY}</Key><ETag>\"multi-{parts}\"</ETag>\
                             </CompleteMultipartUploadResult>"
                        )),
                    )
                }
                ("DELETE", _) => (
                    Call::Abort,
                    http::Response::builder()
                        .status(204)
                        .body(SdkBody::empty())
                        .unwrap(),
                ),
                (method, _) => panic!("unexpected S3 call: {method} ?{query}"),
            };

            self.calls.lock().unwrap().push(call);
            response
        }

        fn client(&self) -> Client {
            let fake = self.clone();
            let config = aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new("us-east-1"))
                .credentials_provider(Credentials::new("AKID", "secret", None, None, "test"))
                .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
                .stalled_stream_protection(StalledStreamProtectionConfig::disabled())
                .retry_config(RetryConfig::disabled())
                .http_client(infallible_client_fn(move |req| fake.answer(req)))
                .build();
            Client::from_conf(config)
        }
    }

    fn ok_with_etag(e_tag: &str) -> http::Response<SdkBody> {
        http::Response::builder()
            .status(200)
            .header("ETag", e_tag)
            .body(SdkBody::empty())
            .unwrap()
    }

    fn xml(body: String) -> http::Response<SdkBody> {
        http::Response::builder()
            .status(200)
            .header("Content-Type", "application/xml")
            .body(SdkBody::from(body))
            .unwrap()
    }

    fn access_denied() -> http::Response<SdkBody> {
        http::Response::builder()
            .status(403)
            .header("Content-Type", "application/xml")
            .body(SdkBody::from(
                "<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>",
            ))
            .unwrap()
    }

    fn audio(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_part_size_never_below_s3_minimum() {
        let fake = FakeS3::default();
        let uploader = S3Uploader::new(fake.client()).with_part_size(1024);
        assert_eq!(uploader.part_size, MIN_PART_SIZE);

        let uploader = S3Uploader::new(fake.client()).with_part_size(8 * 1024 * 1024);
        assert_eq!(uploader.part_size, 8 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_short_audio_is_one_put_object() {
        let fake = FakeS3::default();
        let uploader = S3Uploader::new(fake.client());
        let payload = audio(4096);

        let receipt = uploader
            .upload(BUCKET, KEY, AudioStream::from_bytes(payload.clone()))
            .await
            .unwrap();

        assert_eq!(
            fake.calls(),
            vec![Call::Put {
                content_type: Some(CONTENT_TYPE.to_string()),
                body: payload,
            }]
        );
        assert_eq!(receipt.location, format!("s3://{BUCKET}/{KEY}"));
        assert_eq!(receipt.e_tag.as_deref(), Some("\"single\""));
        assert_eq!(receipt.bytes, 4096);
    }

    #[tokio::test]
    async fn test_long_audio_is_split_into_parts() {
        let fake = FakeS3::default();
        let uploader = S3Uploader::new(fake.client());
        let payload = audio(12 * 1024 * 1024 + 100);

        let receipt = uploader
            .upload(BUCKET, KEY, AudioStream::from_bytes(payload.clone()))
            .await
            .unwrap();

        assert_eq!(
            fake.part_sizes(),
            vec![MIN_PART_SIZE, MIN_PART_SIZE, 2 * 1024 * 1024 + 100]
        );
        assert_eq!(fake.uploaded_bytes(), payload);

        let calls = fake.calls();
        assert_eq!(calls.first(), Some(&Call::Create));
        assert_eq!(calls.last(), Some(&Call::Complete { parts: 3 }));
        assert!(!calls.contains(&Call::Abort));
        let numbers: Vec<i32> = calls
            .iter()
            .filter_map(|call| match call {
                Call::Part { number, .. } => Some(*number),
                _ => None,
            })
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        assert_eq!(receipt.bytes, payload.len() as u64);
        assert_eq!(receipt.e_tag.as_deref(), Some("\"multi-3\""));
    }

    #[tokio::test]
    async fn test_exact_multiple_of_part_size_has_no_empty_part() {
        let fake = FakeS3::default();
        let uploader = S3Uploader::new(fake.client());

        uploader
            .upload(BUCKET, KEY, AudioStream::from_bytes(audio(2 * MIN_PART_SIZE)))
            .await
            .unwrap();

        assert_eq!(fake.part_sizes(), vec![MIN_PART_SIZE, MIN_PART_SIZE]);
        assert_eq!(fake.calls().last(), Some(&Call::Complete { parts: 2 }));
    }

    #[tokio::test]
    async fn test_failed_part_aborts_multipart_upload() {
        let fake = FakeS3::failing_part(2);
        let uploader = S3Uploader::new(fake.client());

        let err = uploader
            .upload(BUCKET, KEY, AudioStream::from_bytes(audio(12 * 1024 * 1024)))
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("AccessDenied"));
        let calls = fake.calls();
        assert_eq!(calls.iter().filter(|c| **c == Call::Abort).count(), 1);
        assert!(!calls.iter().any(|c| matches!(c, Call::Complete { .. })));
        // Nothing is read past the failing part
        assert_eq!(fake.part_sizes(), vec![MIN_PART_SIZE, MIN_PART_SIZE]);
    }
}
