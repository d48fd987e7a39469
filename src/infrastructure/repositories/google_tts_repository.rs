use super::tts_repository::{SynthesisError, SynthesisRequest, TtsRepository};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

pub const GOOGLE_TTS_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeBody<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate_hertz: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speaking_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pitch: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

/// Google Cloud Text-to-Speech implementation of TTS repository
pub struct GoogleTtsRepository {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GoogleTtsRepository {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }

    fn body(request: &SynthesisRequest) -> SynthesizeBody<'_> {
        SynthesizeBody {
            input: SynthesisInput {
                text: &request.text,
            },
            voice: VoiceSelection {
                language_code: &request.language_code,
                name: &request.voice_name,
            },
            audio_config: AudioConfig {
                audio_encoding: request.encoding.as_str(),
                sample_rate_hertz: request.profile.sample_rate_hertz,
                speaking_rate: request.profile.speaking_rate,
                pitch: request.profile.pitch,
            },
        }
    }

    /// Map an error status to the failure kind the pipeline cares about
    fn classify(status: StatusCode, message: String) -> SynthesisError {
        if status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::REQUEST_TIMEOUT
            || status.is_server_error()
        {
            SynthesisError::Transient(format!("{}: {}", status, message))
        } else {
            SynthesisError::Rejected(format!("{}: {}", status, message))
        }
    }

    /// A 200 whose payload is not base64 will not get better on retry
    fn decode_audio(response: SynthesizeResponse) -> Result<Bytes, SynthesisError> {
        if response.audio_content.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }
        STANDARD
            .decode(response.audio_content.as_bytes())
            .map(Bytes::from)
            .map_err(|e| SynthesisError::Rejected(format!("malformed audio content: {}", e)))
    }
}

#[async_trait]
impl TtsRepository for GoogleTtsRepository {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, SynthesisError> {
        let start_time = std::time::Instant::now();

        tracing::info!(
            language = %request.language_code,
            voice = %request.voice_name,
            encoding = request.encoding.as_str(),
            text_length = request.text.len(),
            text_preview = %request.text.chars().take(80).collect::<String>(),
            "Calling Google text:synthesize"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::body(request))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, voice = %request.voice_name, "Google TTS request failed");
                SynthesisError::Transient(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!(
                status = status.as_u16(),
                error = %error_text,
                voice = %request.voice_name,
                "Google TTS returned an error"
            );
            return Err(Self::classify(status, error_text));
        }

        let body: SynthesizeResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Google TTS response");
            SynthesisError::Transient(format!("failed to parse response: {}", e))
        })?;
        let audio = Self::decode_audio(body)?;

        tracing::info!(
            provider = "google",
            latency_ms = start_time.elapsed().as_millis(),
            audio_size_bytes = audio.len(),
            "Chunk synthesized"
        );

        Ok(audio)
    }
}
