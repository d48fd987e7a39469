use super::{decoder, AudioCodec, CodecError, PcmBuffer};
use bytes::Bytes;
use std::io::Cursor;

/// Decodes MP3 or WAV fragments with symphonia and writes 16-bit PCM WAV with hound
#[derive(Debug, Default, Clone, Copy)]
pub struct WavCodec;

impl AudioCodec for WavCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PcmBuffer, CodecError> {
        decoder::decode(bytes)
    }

    fn encode(&self, buffer: &PcmBuffer) -> Result<Bytes, CodecError> {
        let spec = hound::WavSpec {
            channels: buffer.channels,
            sample_rate: buffer.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| CodecError::Encode(e.to_string()))?;
            for &s in &buffer.samples {
                writer
                    .write_sample(decoder::to_i16(s))
                    .map_err(|e| CodecError::Encode(e.to_string()))?;
            }
            writer
                .finalize()
                .map_err(|e| CodecError::Encode(e.to_string()))?;
        }

        Ok(Bytes::from(cursor.into_inner()))
    }

    fn content_type(&self) -> &'static str {
        "audio/wav"
    }

    fn extension(&self) -> &'static str {
        "wav"
    }
}
