//! Incremental FLAC encoding and container probing
//!
//! Settings:
//! - capture sample rate (44.1 kHz by default)
//! - Mono channel
//! - 16-bit samples

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::Duration;

use flacenc::bitsink::ByteSink;
use flacenc::component::{BitRepr, Stream, StreamInfo};
use flacenc::config;
use flacenc::error::{Verified, Verify};
use flacenc::source::{Fill, FrameBuf};

/// Bits per sample (16-bit audio)
const BITS_PER_SAMPLE: usize = 16;

/// Number of channels (mono)
const CHANNELS: usize = 1;

/// `fLaC` marker plus the STREAMINFO block header and body
const STREAMINFO_END: usize = 4 + 4 + 34;

/// Silence written for recordings that captured nothing, so the output is
/// still a decodable stream
pub const MIN_SAMPLES: usize = 16;

fn verified_config() -> Result<Verified<config::Encoder>, EncodingError> {
    config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| EncodingError::Config(format!("{:?}", e)))
}

/// Check that the encoder configuration is usable
pub fn verify_encoder_config() -> Result<(), EncodingError> {
    verified_config().map(|_| ())
}

/// `fLaC` marker followed by `stream_info` as the only metadata block
fn header_bytes(stream_info: &StreamInfo) -> Result<Vec<u8>, EncodingError> {
    let mut sink = ByteSink::new();
    Stream::with_stream_info(stream_info.clone())
        .write(&mut sink)
        .map_err(|e| EncodingError::Write(e.to_string()))?;
    Ok(sink.into_inner())
}

/// Sample and byte counts of a finished stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlacTotals {
    pub samples: u64,
    pub bytes: u64,
}

/// Mono 16-bit FLAC stream written one fixed-size block at a time.
///
/// At most one block of PCM is buffered. STREAMINFO goes out first with
/// placeholder totals and is rewritten in place by `finish`. The MD5 field
/// stays zero, which marks the checksum as not computed.
pub struct FlacWriter<W: Write + Seek> {
    out: W,
    config: Verified<config::Encoder>,
    stream_info: StreamInfo,
    framebuf: FrameBuf,
    pending: Vec<i32>,
    frame_number: usize,
    samples: u64,
    bytes: u64,
}

impl<W: Write + Seek> FlacWriter<W> {
    pub fn new(mut out: W, sample_rate: u32) -> Result<Self, EncodingError> {
        if sample_rate == 0 {
            return Err(EncodingError::Config("sample rate must be positive".into()));
        }
        let config = verified_config()?;
        let block_size = config.block_size;
        let stream_info = StreamInfo::new(sample_rate as usize, CHANNELS, BITS_PER_SAMPLE)
            .map_err(|e| EncodingError::Config(format!("{:?}", e)))?;
        let framebuf = FrameBuf::with_size(CHANNELS, block_size)
            .map_err(|e| EncodingError::Config(format!("{:?}", e)))?;

        let header = header_bytes(&stream_info)?;
        out.write_all(&header)
            .map_err(|e| EncodingError::Write(e.to_string()))?;

        Ok(Self {
            out,
            config,
            stream_info,
            framebuf,
            pending: Vec::with_capacity(block_size),
            frame_number: 0,
            samples: 0,
            bytes: header.len() as u64,
        })
    }

    /// Samples per encoded block
    pub fn block_size(&self) -> usize {
        self.framebuf.size()
    }

    /// Buffer `samples`, encoding and writing every block that fills
    pub fn write_samples<I>(&mut self, samples: I) -> Result<(), EncodingError>
    where
        I: IntoIterator<Item = i16>,
    {
        for sample in samples {
            self.pending.push(i32::from(sample));
            self.samples += 1;
            if self.pending.len() == self.block_size() {
                self.encode_pending()?;
            }
        }
        Ok(())
    }

    fn encode_pending(&mut self) -> Result<(), EncodingError> {
        // A short final block is zero padded; STREAMINFO carries the real length
        self.pending.resize(self.block_size(), 0);
        self.framebuf
            .fill_interleaved(&self.pending)
            .map_err(|e| EncodingError::Encode(format!("{:?}", e)))?;

        let frame = flacenc::encode_fixed_size_frame(
            &self.config,
            &self.framebuf,
            self.frame_number,
            &self.stream_info,
        )
        .map_err(|e| EncodingError::Encode(format!("{:?}", e)))?;
        self.stream_info.update_frame_info(&frame);

        let mut sink = ByteSink::new();
        frame
            .write(&mut sink)
            .map_err(|e| EncodingError::Write(e.to_string()))?;
        let bytes = sink.into_inner();
        self.out
            .write_all(&bytes)
            .map_err(|e| EncodingError::Write(e.to_string()))?;

        self.bytes += bytes.len() as u64;
        self.frame_number += 1;
        self.pending.clear();
        Ok(())
    }

    /// Encode the last partial block, patch STREAMINFO, flush.
    ///
    /// Streams shorter than `MIN_SAMPLES` are padded with silence.
    pub fn finish(mut self) -> Result<(W, FlacTotals), EncodingError> {
        if self.samples < MIN_SAMPLES as u64 {
            let missing = MIN_SAMPLES - self.samples as usize;
            self.write_samples(std::iter::repeat(0).take(missing))?;
        }
        if !self.pending.is_empty() {
            self.encode_pending()?;
        }

        self.stream_info.set_total_samples(self.samples as usize);
        let header = header_bytes(&self.stream_info)?;
        let write_failed = |e: std::io::Error| EncodingError::Write(e.to_string());
        self.out.seek(SeekFrom::Start(0)).map_err(write_failed)?;
        self.out.write_all(&header).map_err(write_failed)?;
        self.out.seek(SeekFrom::End(0)).map_err(write_failed)?;
        self.out.flush().map_err(write_failed)?;

        let totals = FlacTotals {
            samples: self.samples,
            bytes: self.bytes,
        };
        Ok((self.out, totals))
    }
}

/// Stream parameters read from a FLAC file's STREAMINFO block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlacInfo {
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    pub total_samples: u64,
}

impl FlacInfo {
    /// Parse the leading `fLaC` marker and STREAMINFO block
    pub fn parse(bytes: &[u8]) -> Result<Self, EncodingError> {
        if bytes.len() < STREAMINFO_END {
            return Err(EncodingError::Invalid("file too short".into()));
        }
        if &bytes[0..4] != b"fLaC" {
            return Err(EncodingError::Invalid("missing fLaC marker".into()));
        }
        let block_type = bytes[4] & 0x7F;
        let block_len = u32::from_be_bytes([0, bytes[5], bytes[6], bytes[7]]);
        if block_type != 0 || block_len != 34 {
            return Err(EncodingError::Invalid(
                "first metadata block is not STREAMINFO".into(),
            ));
        }

        // 20 bits rate, 3 bits channels-1, 5 bits bps-1, 36 bits total samples
        let mut packed = [0u8; 8];
        packed.copy_from_slice(&bytes[18..26]);
        let v = u64::from_be_bytes(packed);

        let info = Self {
            sample_rate: (v >> 44) as u32,
            channels: (((v >> 41) & 0x7) + 1) as u8,
            bits_per_sample: (((v >> 36) & 0x1F) + 1) as u8,
            total_samples: v & 0xF_FFFF_FFFF,
        };
        if info.sample_rate == 0 {
            return Err(EncodingError::Invalid("sample rate is zero".into()));
        }
        Ok(info)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_samples as f64 / self.sample_rate as f64)
    }
}

/// Read the STREAMINFO header of the FLAC file at `path`
pub fn probe_flac(path: &Path) -> Result<FlacInfo, EncodingError> {
    let mut header = [0u8; STREAMINFO_END];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut header))
        .map_err(|e| EncodingError::Invalid(format!("{}: {}", path.display(), e)))?;
    FlacInfo::parse(&header)
}

/// FLAC encoding errors
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("FLAC config error: {0}")]
    Config(String),

    #[error("FLAC encoding failed: {0}")]
    Encode(String),

    #[error("FLAC write failed: {0}")]
    Write(String),

    #[error("Not a valid FLAC file: {0}")]
    Invalid(String),
}
