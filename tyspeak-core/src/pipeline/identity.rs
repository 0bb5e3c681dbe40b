use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use ulid::Generator;

use super::provider::IdGenerator;
use super::types::ArtifactId;

/// Monotonic ULID source. Ids from one generator are strictly increasing,
/// even when several are issued within the same millisecond.
pub struct UlidGenerator {
    inner: Mutex<Generator>,
}

impl UlidGenerator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Generator::new()),
        }
    }
}

impl Default for UlidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for UlidGenerator {
    fn next_id(&self) -> Result<ArtifactId> {
        let now = SystemTime::now();
        now.duration_since(UNIX_EPOCH)
            .context("System clock is set before the Unix epoch")?;

        let mut generator = self
            .inner
            .lock()
            .map_err(|_| anyhow!("ULID generator lock poisoned"))?;
        let ulid = generator
            .generate_from_datetime(now)
            .map_err(|e| anyhow!("Failed to generate ULID: {e}"))?;

        Ok(ArtifactId::new(ulid))
    }
}
