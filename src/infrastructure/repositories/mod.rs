pub mod google_tts_repository;
pub mod tts_repository;

pub use google_tts_repository::GoogleTtsRepository;
pub use tts_repository::{AudioEncoding, SynthesisError, SynthesisRequest, TtsRepository};
