pub mod config;


pub use config::{AwsSettings, ConfigError, RelayConfig};
