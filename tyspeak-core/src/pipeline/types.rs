use std::fmt;

use anyhow::Result;
use aws_smithy_types::byte_stream::ByteStream;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Extension of every stored artifact; also reported as `file_type`.
pub const FILE_EXTENSION: &str = "mp3";

/// Sample rate requested from the synthesis service, in Hz.
pub const SAMPLE_RATE: &str = "16000";

/// Content type used for the stored object when the synthesizer reports none.
pub const CONTENT_TYPE: &str = "audio/mpeg";

/// Invocation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: String,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
        }
    }
}

/// Invocation result. The zero value (`Default`) is what hosts report on
/// failure; the accompanying error is authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechResponse {
    pub success: bool,
    pub file_name: String,
    pub file_type: String,
}

impl SpeechResponse {
    pub fn stored(id: &ArtifactId) -> Self {
        Self {
            success: true,
            file_name: id.to_string(),
            file_type: FILE_EXTENSION.to_string(),
        }
    }

    pub fn failure() -> Self {
        Self::default()
    }
}

/// Time-ordered unique id of one synthesized artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId(Ulid);

impl ArtifactId {
    pub fn new(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Key of the stored object, which doubles as the queue message body.
    pub fn object_key(&self) -> String {
        format!("{}.{FILE_EXTENSION}", self.0)
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Audio returned by synthesis. Owned by whoever consumes it; dropping it
/// releases the underlying connection.
#[derive(Debug)]
pub struct AudioStream {
    body: ByteStream,
    pending: Vec<u8>,
    content_type: Option<String>,
}

impl AudioStream {
    pub fn new(body: ByteStream) -> Self {
        Self {
            body,
            pending: Vec::new(),
            content_type: None,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(ByteStream::from(bytes))
    }

    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Move audio into `buf` until it holds exactly `limit` bytes or the
    /// stream ends. Bytes past `limit` are kept for the next call. Returns
    /// true once the stream is exhausted.
    pub async fn fill(&mut self, buf: &mut Vec<u8>, limit: usize) -> Result<bool> {
        loop {
            let room = limit.saturating_sub(buf.len());
            let take = room.min(self.pending.len());
            buf.extend(self.pending.drain(..take));

            if buf.len() >= limit {
                return Ok(false);
            }

            match self.body.next().await {
                Some(chunk) => self.pending.extend_from_slice(&chunk?),
                None => return Ok(true),
            }
        }
    }

    /// Drain the remaining audio into memory.
    pub async fn collect(mut self) -> Result<Vec<u8>> {
        let rest = self.body.collect().await?.into_bytes();
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(&rest);
        Ok(bytes)
    }
}

/// What the object store reported for a finished upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub location: String,
    pub e_tag: Option<String>,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublishReceipt {
    pub message_id: Option<String>,
}
