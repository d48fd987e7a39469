mod decoder;
pub mod mp3_codec;
pub mod wav_codec;

pub use mp3_codec::Mp3Codec;
pub use wav_codec::WavCodec;

use crate::infrastructure::repositories::AudioEncoding;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to decode audio: {0}")]
    Decode(String),
    #[error("failed to encode audio: {0}")]
    Encode(String),
    #[error("cannot join {found} audio onto {expected} audio")]
    FormatMismatch { expected: String, found: String },
}

/// Decoded audio: interleaved samples in `[-1.0, 1.0]`
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl PcmBuffer {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            samples: Vec::new(),
        }
    }

    /// Number of sample frames (one sample per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    fn describe(&self) -> String {
        format!("{} Hz/{} ch", self.sample_rate, self.channels)
    }
}

/// Audio codec the assembler is built on.
///
/// Implementations only need `decode` and `encode`; joining two buffers is
/// shared and refuses buffers whose sample format differs.
pub trait AudioCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<PcmBuffer, CodecError>;

    fn encode(&self, buffer: &PcmBuffer) -> Result<Bytes, CodecError>;

    /// Append `tail` to `head`. On error `head` is left untouched.
    fn concatenate(&self, head: &mut PcmBuffer, tail: PcmBuffer) -> Result<(), CodecError> {
        if head.sample_rate != tail.sample_rate || head.channels != tail.channels {
            return Err(CodecError::FormatMismatch {
                expected: head.describe(),
                found: tail.describe(),
            });
        }
        head.samples.extend(tail.samples);
        Ok(())
    }

    /// MIME type of what `encode` produces
    fn content_type(&self) -> &'static str;

    /// File extension of what `encode` produces, without the dot
    fn extension(&self) -> &'static str;
}

/// The codec that writes the same container the synthesis service answers
/// with, so single-call and merged outputs look alike
pub fn codec_for(encoding: AudioEncoding) -> Arc<dyn AudioCodec> {
    match encoding {
        AudioEncoding::Mp3 => Arc::new(Mp3Codec),
        AudioEncoding::Linear16 => Arc::new(WavCodec),
    }
}
