use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::handler::Stage;

/// Failure of one pipeline step. Every variant is terminal for the request
/// and displays as the failing service's own message; the variant names the
/// step.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("{0:#}")]
    IdentityGeneration(anyhow::Error),

    #[error("{0:#}")]
    Synthesis(anyhow::Error),

    #[error("{0:#}")]
    Upload(anyhow::Error),

    #[error("{0:#}")]
    Publish(anyhow::Error),
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IdentityGeneration(_) => ErrorKind::IdentityGeneration,
            Self::Synthesis(_) => ErrorKind::Synthesis,
            Self::Upload(_) => ErrorKind::Upload,
            Self::Publish(_) => ErrorKind::Publish,
        }
    }

    /// Last stage the request reached before this error moved it to `Failed`.
    pub fn failed_after(&self) -> Stage {
        match self {
            Self::IdentityGeneration(_) => Stage::Init,
            Self::Synthesis(_) => Stage::IdentityGenerated,
            Self::Upload(_) => Stage::Synthesized,
            Self::Publish(_) => Stage::Uploaded,
        }
    }

    /// The underlying client error, as reported by the failing service.
    pub fn cause(&self) -> &anyhow::Error {
        match self {
            Self::IdentityGeneration(e)
            | Self::Synthesis(e)
            | Self::Upload(e)
            | Self::Publish(e) => e,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    IdentityGeneration,
    Synthesis,
    Upload,
    Publish,
    /// The host could not decode the request; the pipeline never ran.
    InvalidRequest,
}
