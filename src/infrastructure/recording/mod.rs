//! Recording infrastructure module
//!
//! Writes captured audio to FLAC files, encoding each block as it fills.

mod flac_encoder;
mod flac_sink;

pub use flac_encoder::{probe_flac, EncodingError, FlacInfo, FlacTotals, FlacWriter};
pub use flac_sink::{partial_path, FlacSink, FlacSinkFactory};
