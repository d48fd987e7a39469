use super::assembler::AssemblyError;
use super::voice::VoiceError;
use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    #[error("no text provided")]
    NoText,
    #[error("text is {length} characters, the limit is {limit}")]
    SizeLimitExceeded { length: usize, limit: usize },
    #[error("invalid voice: {0}")]
    InvalidVoice(#[from] VoiceError),
    #[error("synthesis failed: {0}")]
    Synthesis(String),
    #[error("assembly failed: {0}")]
    Assembly(#[from] AssemblyError),
}

impl From<NarrationError> for AppError {
    fn from(err: NarrationError) -> Self {
        match err {
            NarrationError::NoText => AppError::BadRequest(err.to_string()),
            NarrationError::SizeLimitExceeded { .. } => AppError::PayloadTooLarge(err.to_string()),
            NarrationError::InvalidVoice(_) => AppError::BadRequest(err.to_string()),
            NarrationError::Synthesis(msg) => AppError::ExternalService(msg),
            NarrationError::Assembly(e) => AppError::Internal(e.to_string()),
        }
    }
}
