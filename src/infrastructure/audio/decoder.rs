use super::{CodecError, PcmBuffer};
use std::io::Cursor;
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

/// Decode any container symphonia can probe (MP3 or WAV) into interleaved
/// `f32` samples
pub(super) fn decode(bytes: &[u8]) -> Result<PcmBuffer, CodecError> {
    let source = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    // Gapless trims the encoder delay and padding LAME records in MP3 output
    let format_options = FormatOptions {
        enable_gapless: true,
        ..Default::default()
    };

    let mut format = symphonia::default::get_probe()
        .format(&Hint::new(), mss, &format_options, &MetadataOptions::default())
        .map_err(|e| CodecError::Decode(e.to_string()))?
        .format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| CodecError::Decode("no audio track".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| CodecError::Decode(e.to_string()))?;

    let mut buffer: Option<PcmBuffer> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(CodecError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                samples.copy_interleaved_ref(decoded);

                let pcm = buffer.get_or_insert_with(|| {
                    PcmBuffer::new(spec.rate, spec.channels.count() as u16)
                });
                pcm.samples.extend_from_slice(samples.samples());
            }
            // Corrupt frame, keep going with the rest of the stream
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(CodecError::Decode(e.to_string())),
        }
    }

    buffer
        .filter(|pcm| !pcm.samples.is_empty())
        .ok_or_else(|| CodecError::Decode("no audio samples".to_string()))
}

/// Scale a `[-1.0, 1.0]` sample to 16-bit PCM, clipping out-of-range input
pub(super) fn to_i16(sample: f32) -> i16 {
    (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
