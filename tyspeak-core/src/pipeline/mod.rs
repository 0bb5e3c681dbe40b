pub mod handler;
pub mod identity;
pub mod mock;
pub mod provider;
pub mod types;
