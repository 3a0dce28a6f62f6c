//! Configuration value objects

pub mod app_config;

pub use app_config::{AppConfig, InputSource, DEFAULT_QUEUE_DEPTH};
