use super::voice::Voice;
use crate::infrastructure::repositories::{
    AudioEncoding, SynthesisError, SynthesisRequest, TtsRepository,
};
use bytes::Bytes;
use std::sync::Arc;

/// Turns one chunk of text and a voice into encoded audio
pub struct SynthesisClient {
    tts_repo: Arc<dyn TtsRepository>,
    encoding: AudioEncoding,
}

impl SynthesisClient {
    pub fn new(tts_repo: Arc<dyn TtsRepository>, encoding: AudioEncoding) -> Self {
        Self { tts_repo, encoding }
    }

    /// Encoding of every fragment this client produces
    pub fn encoding(&self) -> AudioEncoding {
        self.encoding
    }

    /// Build the service request for a chunk: locale and tier profile come
    /// from the voice identifier
    pub fn request_for(&self, text: &str, voice: &Voice) -> SynthesisRequest {
        SynthesisRequest {
            text: text.to_string(),
            language_code: voice.language_code().to_string(),
            voice_name: voice.name().to_string(),
            encoding: self.encoding,
            profile: voice.profile(),
        }
    }

    pub async fn synthesize(&self, text: &str, voice: &Voice) -> Result<Bytes, SynthesisError> {
        let request = self.request_for(text, voice);
        let audio = self.tts_repo.synthesize(&request).await?;

        if audio.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }
        Ok(audio)
    }
}
