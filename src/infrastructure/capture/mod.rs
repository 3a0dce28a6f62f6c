//! Audio input infrastructure module
//!
//! Provides the cpal hardware driver and a synthetic sine generator
//! behind the `AudioInput` port.

mod cpal_input;
mod sine_input;

use std::sync::Arc;

pub use cpal_input::{
    available_hosts, list_input_devices, CpalInput, CpalInputOptions, InputDeviceInfo,
};
pub use sine_input::{SineEncoding, SineInput};

use crate::application::ports::AudioInput;
use crate::domain::config::{AppConfig, InputSource};

/// Create the input selected by `config.source`
pub fn create_input(config: &AppConfig) -> Arc<dyn AudioInput> {
    match config.source_or_default() {
        InputSource::Microphone => Arc::new(CpalInput::new(CpalInputOptions {
            host: config.host.clone(),
            device: config.device.clone(),
            stall_timeout: config.stall_timeout_or_default().as_std(),
        })),
        InputSource::Sine => Arc::new(SineInput::new()),
    }
}
