pub mod assembler;
pub mod chunker;
pub mod client;
pub mod error;
pub mod pacing;
pub mod service;
pub mod voice;

use crate::domain::workspace::NarrationMetadata;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use error::NarrationError;
pub use pacing::{Timer, TokioTimer};
pub use service::{NarrationService, NarrationServiceApi, NarrationSettings, PipelineStage};
pub use voice::{Voice, VoiceCatalog, VoiceTier};

/// Request for POST /api/narrations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationRequest {
    pub text: String,
    pub voice: String,
    /// Name of the uploaded file, used for the download name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Outcome of a finished narration
#[derive(Debug, Clone, Serialize)]
pub struct NarrationReport {
    pub workspace_id: Uuid,
    #[serde(flatten)]
    pub metadata: NarrationMetadata,
}
