use crate::domain::narration::voice::EncodingProfile;
use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SynthesisError {
    /// Network, quota or server trouble; the same call may work later
    #[error("synthesis service unavailable: {0}")]
    Transient(String),
    /// The service refused the input (unknown voice, invalid or oversized text)
    #[error("synthesis rejected: {0}")]
    Rejected(String),
    #[error("synthesis service returned no audio")]
    EmptyAudio,
}

/// Container the synthesis service should answer with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    Mp3,
    Linear16,
}

impl AudioEncoding {
    /// Name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "MP3",
            AudioEncoding::Linear16 => "LINEAR16",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "audio/mpeg",
            // LINEAR16 responses carry a WAV header
            AudioEncoding::Linear16 => "audio/wav",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "mp3",
            AudioEncoding::Linear16 => "wav",
        }
    }
}

impl std::str::FromStr for AudioEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp3" => Ok(AudioEncoding::Mp3),
            "linear16" | "wav" => Ok(AudioEncoding::Linear16),
            other => Err(format!("unsupported audio encoding '{}'", other)),
        }
    }
}

/// One call to the synthesis service
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub language_code: String,
    pub voice_name: String,
    pub encoding: AudioEncoding,
    pub profile: EncodingProfile,
}

/// Repository for TTS synthesis operations.
/// Abstracts the underlying TTS provider.
///
/// Implementations synthesize exactly one request per call. Splitting,
/// pacing and merging are handled by the narration pipeline.
#[async_trait]
pub trait TtsRepository: Send + Sync {
    /// Synthesize one piece of text
    ///
    /// # Errors
    /// Returns a [`SynthesisError`] if the provider fails or refuses the input
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, SynthesisError>;
}
