pub mod error;
pub mod pipeline;
pub mod settings;
#[cfg(feature = "aws")]
pub mod aws;

// Public library API - hosts embedding the relay should only need these.
pub use error::{ErrorKind, RelayError};
pub use pipeline::handler::{SpeechHandler, Stage};
pub use pipeline::provider::{IdGenerator, ObjectUploader, Publisher, Synthesizer};
pub use pipeline::types::{ArtifactId, AudioStream, SpeechRequest, SpeechResponse};
pub use settings::{ConfigError, RelayConfig};
