use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        narration::{NarrationReport, NarrationRequest, NarrationServiceApi, VoiceTier},
        workspace::OutputArtifact,
    },
    error::{AppError, AppResult},
};

/// One entry of GET /api/voices
#[derive(Debug, Serialize)]
pub struct VoiceResponse {
    pub name: String,
    pub language_code: String,
    pub tier: VoiceTier,
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceResponse>,
}

/// How the audio should be presented by the client
#[derive(Debug, Clone, Copy)]
enum Disposition {
    Inline,
    Attachment,
}

pub struct NarrationController {
    narration_service: Arc<dyn NarrationServiceApi>,
}

impl NarrationController {
    pub fn new(narration_service: Arc<dyn NarrationServiceApi>) -> Self {
        Self { narration_service }
    }

    /// POST /api/narrations - Turn a document into audio
    pub async fn synthesize(
        State(controller): State<Arc<NarrationController>>,
        Json(request): Json<NarrationRequest>,
    ) -> AppResult<(StatusCode, Json<NarrationReport>)> {
        let report = controller.narration_service.narrate(request).await?;
        Ok((StatusCode::CREATED, Json(report)))
    }

    /// GET /api/narrations/:id - Metadata of a finished narration
    pub async fn metadata(
        State(controller): State<Arc<NarrationController>>,
        Path(id): Path<Uuid>,
    ) -> AppResult<Json<NarrationReport>> {
        let artifact = controller.find(id).await?;
        Ok(Json(NarrationReport {
            workspace_id: id,
            metadata: artifact.metadata.clone(),
        }))
    }

    /// GET /api/narrations/:id/play - Stream the audio inline
    pub async fn play(
        State(controller): State<Arc<NarrationController>>,
        Path(id): Path<Uuid>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let artifact = controller.find(id).await?;
        audio_response(&artifact, Disposition::Inline).await
    }

    /// GET /api/narrations/:id/download - Audio as a file download
    pub async fn download(
        State(controller): State<Arc<NarrationController>>,
        Path(id): Path<Uuid>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let artifact = controller.find(id).await?;
        audio_response(&artifact, Disposition::Attachment).await
    }

    /// DELETE /api/narrations/:id - Release the narration and its storage
    pub async fn cleanup(
        State(controller): State<Arc<NarrationController>>,
        Path(id): Path<Uuid>,
    ) -> StatusCode {
        controller.narration_service.release(id).await;
        StatusCode::NO_CONTENT
    }

    /// GET /api/voices - Voices this deployment offers
    pub async fn voices(
        State(controller): State<Arc<NarrationController>>,
    ) -> Json<VoicesResponse> {
        let voices = controller
            .narration_service
            .voices()
            .voices()
            .iter()
            .map(|voice| VoiceResponse {
                name: voice.name().to_string(),
                language_code: voice.language_code().to_string(),
                tier: voice.tier(),
            })
            .collect();

        Json(VoicesResponse { voices })
    }

    async fn find(&self, id: Uuid) -> AppResult<Arc<OutputArtifact>> {
        self.narration_service
            .artifact(id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("narration {}", id)))
    }
}

async fn audio_response(
    artifact: &OutputArtifact,
    disposition: Disposition,
) -> AppResult<(StatusCode, HeaderMap, Body)> {
    let audio = artifact.audio.read().await.map_err(|e| {
        AppError::Internal(format!("narration audio is no longer readable: {}", e))
    })?;
    let metadata = &artifact.metadata;

    let disposition = match disposition {
        Disposition::Inline => format!("inline; filename=\"{}\"", metadata.filename),
        Disposition::Attachment => format!("attachment; filename=\"{}\"", metadata.filename),
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, header_value(&metadata.content_type)?);
    headers.insert(header::CONTENT_DISPOSITION, header_value(&disposition)?);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(audio.len()));
    headers.insert(
        HeaderName::from_static("x-chunks-count"),
        HeaderValue::from(metadata.chunks_count),
    );
    headers.insert(
        HeaderName::from_static("x-character-count"),
        HeaderValue::from(metadata.text_length),
    );
    if let Some(duration) = metadata.duration_seconds {
        headers.insert(
            HeaderName::from_static("x-duration-seconds"),
            header_value(&format!("{:.2}", duration))?,
        );
    }

    Ok((StatusCode::OK, headers, Body::from(audio)))
}

fn header_value(value: &str) -> AppResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::Internal(format!("invalid header value '{}': {}", value, e)))
}
