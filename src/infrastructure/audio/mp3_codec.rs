use super::{decoder, AudioCodec, CodecError, PcmBuffer};
use bytes::Bytes;
use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, InterleavedPcm, MonoPcm, Quality};

/// Upper bound LAME needs for whatever a flush emits
const FLUSH_BUFFER_BYTES: usize = 7_200;

/// Decodes with symphonia like [`super::WavCodec`] and writes constant
/// bitrate MP3 with LAME
#[derive(Debug, Default, Clone, Copy)]
pub struct Mp3Codec;

impl Mp3Codec {
    /// A bitrate every MPEG version accepts at `sample_rate`
    fn bitrate_for(sample_rate: u32) -> Bitrate {
        match sample_rate {
            rate if rate >= 32_000 => Bitrate::Kbps128,
            rate if rate >= 16_000 => Bitrate::Kbps64,
            _ => Bitrate::Kbps32,
        }
    }
}

impl AudioCodec for Mp3Codec {
    fn decode(&self, bytes: &[u8]) -> Result<PcmBuffer, CodecError> {
        decoder::decode(bytes)
    }

    fn encode(&self, buffer: &PcmBuffer) -> Result<Bytes, CodecError> {
        if !matches!(buffer.channels, 1 | 2) {
            return Err(CodecError::Encode(format!(
                "MP3 holds one or two channels, got {}",
                buffer.channels
            )));
        }

        let mut builder = Builder::new()
            .ok_or_else(|| CodecError::Encode("cannot allocate LAME encoder".to_string()))?;
        builder
            .set_num_channels(buffer.channels as u8)
            .map_err(lame_error)?;
        builder
            .set_sample_rate(buffer.sample_rate)
            .map_err(lame_error)?;
        builder
            .set_brate(Self::bitrate_for(buffer.sample_rate))
            .map_err(lame_error)?;
        builder.set_quality(Quality::Good).map_err(lame_error)?;
        let mut encoder = builder.build().map_err(lame_error)?;

        let pcm: Vec<i16> = buffer.samples.iter().map(|&s| decoder::to_i16(s)).collect();
        let mut out = Vec::with_capacity(
            mp3lame_encoder::max_required_buffer_size(pcm.len()) + FLUSH_BUFFER_BYTES,
        );

        if buffer.channels == 1 {
            encoder.encode_to_vec(MonoPcm(&pcm), &mut out)
        } else {
            encoder.encode_to_vec(InterleavedPcm(&pcm), &mut out)
        }
        .map_err(lame_error)?;
        encoder
            .flush_to_vec::<FlushNoGap>(&mut out)
            .map_err(lame_error)?;

        Ok(Bytes::from(out))
    }

    fn content_type(&self) -> &'static str {
        "audio/mpeg"
    }

    fn extension(&self) -> &'static str {
        "mp3"
    }
}

fn lame_error(e: impl std::fmt::Debug) -> CodecError {
    CodecError::Encode(format!("LAME: {:?}", e))
}
