use super::assembler::{AssembledAudio, Assembler, Fragment};
use super::chunker;
use super::client::SynthesisClient;
use super::error::NarrationError;
use super::pacing::{Throttle, Timer};
use super::voice::{Voice, VoiceCatalog};
use super::{NarrationReport, NarrationRequest};
use crate::domain::workspace::{NarrationMetadata, OutputArtifact, Workspace, WorkspaceManager};
use crate::infrastructure::audio::AudioCodec;
use crate::infrastructure::repositories::{AudioEncoding, SynthesisError, TtsRepository};
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_STEM: &str = "text";

/// Limits and tuning of the narration pipeline
#[derive(Debug, Clone)]
pub struct NarrationSettings {
    pub max_text_chars: usize,
    /// Texts up to this length skip chunking and pacing
    pub direct_max_chars: usize,
    pub chunk_max_chars: usize,
    pub chunk_max_bytes: usize,
    pub merge_block_size: usize,
    pub synthesis_delay: Duration,
    pub audio_encoding: AudioEncoding,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            max_text_chars: 50_000,
            direct_max_chars: 1_000,
            chunk_max_chars: 4_800,
            chunk_max_bytes: 5_000,
            merge_block_size: 5,
            synthesis_delay: Duration::from_millis(500),
            audio_encoding: AudioEncoding::Mp3,
        }
    }
}

/// Where a request currently is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Chunking,
    Synthesizing,
    Assembling,
    Ready,
    Failed,
}

/// Stage bookkeeping for one request, logging every transition
struct Progress {
    stage: PipelineStage,
    workspace_id: Option<Uuid>,
}

impl Progress {
    fn new() -> Self {
        Self {
            stage: PipelineStage::Received,
            workspace_id: None,
        }
    }

    fn enter(&mut self, next: PipelineStage) {
        tracing::debug!(
            workspace_id = ?self.workspace_id,
            from = ?self.stage,
            to = ?next,
            "Pipeline stage"
        );
        self.stage = next;
    }

    fn fail(&mut self, error: &NarrationError) {
        tracing::warn!(
            workspace_id = ?self.workspace_id,
            stage = ?self.stage,
            error = %error,
            "Narration failed"
        );
        self.stage = PipelineStage::Failed;
    }
}

/// Validated input of one request
#[derive(Debug)]
struct Document {
    text: String,
    voice: Voice,
    stem: String,
    length: usize,
}

pub struct NarrationService {
    workspaces: Arc<WorkspaceManager>,
    synthesis: SynthesisClient,
    assembler: Assembler,
    voices: VoiceCatalog,
    timer: Arc<dyn Timer>,
    settings: NarrationSettings,
}

impl NarrationService {
    pub fn new(
        workspaces: Arc<WorkspaceManager>,
        tts_repo: Arc<dyn TtsRepository>,
        codec: Arc<dyn AudioCodec>,
        timer: Arc<dyn Timer>,
        voices: VoiceCatalog,
        settings: NarrationSettings,
    ) -> Self {
        if codec.content_type() != settings.audio_encoding.content_type() {
            tracing::warn!(
                encoding = settings.audio_encoding.as_str(),
                codec = codec.content_type(),
                "Codec does not write what the synthesis service returns"
            );
        }
        Self {
            workspaces,
            synthesis: SynthesisClient::new(tts_repo, settings.audio_encoding),
            assembler: Assembler::new(codec, settings.merge_block_size),
            voices,
            timer,
            settings,
        }
    }
}

#[async_trait]
pub trait NarrationServiceApi: Send + Sync {
    /// Turn a document into one audio artifact
    ///
    /// This operation:
    /// - Validates text and voice before any external call
    /// - Synthesizes short texts in one call, longer ones chunk by chunk
    /// - Merges chunk audio block by block into the request's workspace
    ///
    /// On failure the workspace is released and nothing is published.
    async fn narrate(&self, request: NarrationRequest) -> Result<NarrationReport, NarrationError>;

    /// The published artifact of a workspace, if it is still alive
    async fn artifact(&self, workspace_id: Uuid) -> Option<Arc<OutputArtifact>>;

    /// Release a workspace and its storage; idempotent
    async fn release(&self, workspace_id: Uuid);

    fn voices(&self) -> &VoiceCatalog;
}

#[async_trait]
impl NarrationServiceApi for NarrationService {
    async fn narrate(&self, request: NarrationRequest) -> Result<NarrationReport, NarrationError> {
        let mut progress = Progress::new();

        let document = match self.accept(request) {
            Ok(document) => document,
            Err(e) => {
                progress.fail(&e);
                return Err(e);
            }
        };

        let workspace = self.workspaces.open().await;
        let _in_flight = workspace.begin_run();
        progress.workspace_id = Some(workspace.id());

        tracing::info!(
            workspace_id = %workspace.id(),
            voice = %document.voice,
            text_length = document.length,
            "Narration request accepted"
        );

        if let Err(e) = workspace.store_upload(&document.text).await {
            tracing::warn!(workspace_id = %workspace.id(), error = %e, "Could not keep upload copy");
        }

        match self.run(&mut progress, &document, &workspace).await {
            Ok(artifact) => {
                let artifact = workspace.publish(artifact);
                self.advance(&mut progress, PipelineStage::Ready, &workspace)
                    .await;

                tracing::info!(
                    workspace_id = %workspace.id(),
                    chunks_count = artifact.metadata.chunks_count,
                    failed_chunks = artifact.metadata.failed_chunks.len(),
                    skipped_fragments = artifact.metadata.skipped_fragments.len(),
                    durable = artifact.audio.is_durable(),
                    "Narration ready"
                );

                Ok(NarrationReport {
                    workspace_id: workspace.id(),
                    metadata: artifact.metadata.clone(),
                })
            }
            Err(e) => {
                progress.fail(&e);
                self.workspaces.close(workspace.id()).await;
                Err(e)
            }
        }
    }

    async fn artifact(&self, workspace_id: Uuid) -> Option<Arc<OutputArtifact>> {
        self.workspaces.resolve(workspace_id).await?.artifact()
    }

    async fn release(&self, workspace_id: Uuid) {
        self.workspaces.close(workspace_id).await;
    }

    fn voices(&self) -> &VoiceCatalog {
        &self.voices
    }
}

impl NarrationService {
    /// Received: reject bad input before anything is allocated
    fn accept(&self, request: NarrationRequest) -> Result<Document, NarrationError> {
        if request.text.trim().is_empty() {
            return Err(NarrationError::NoText);
        }

        let length = request.text.chars().count();
        if length > self.settings.max_text_chars {
            return Err(NarrationError::SizeLimitExceeded {
                length,
                limit: self.settings.max_text_chars,
            });
        }

        let voice = self.voices.select(&request.voice)?;

        Ok(Document {
            text: request.text,
            voice,
            stem: display_stem(request.filename.as_deref()),
            length,
        })
    }

    /// Enter the next stage and keep the workspace lease alive
    async fn advance(
        &self,
        progress: &mut Progress,
        next: PipelineStage,
        workspace: &Arc<Workspace>,
    ) {
        progress.enter(next);
        self.workspaces.renew(workspace).await;
    }

    async fn run(
        &self,
        progress: &mut Progress,
        document: &Document,
        workspace: &Arc<Workspace>,
    ) -> Result<OutputArtifact, NarrationError> {
        if document.length <= self.settings.direct_max_chars {
            self.run_direct(progress, document, workspace).await
        } else {
            self.run_chunked(progress, document, workspace).await
        }
    }

    /// Fast path: one call, the answer is the artifact
    async fn run_direct(
        &self,
        progress: &mut Progress,
        document: &Document,
        workspace: &Arc<Workspace>,
    ) -> Result<OutputArtifact, NarrationError> {
        self.advance(progress, PipelineStage::Synthesizing, workspace)
            .await;
        let audio = self
            .synthesis
            .synthesize(&document.text, &document.voice)
            .await
            .map_err(|e| NarrationError::Synthesis(e.to_string()))?;

        self.advance(progress, PipelineStage::Assembling, workspace)
            .await;
        let filename = self.output_name(document);
        let audio = workspace.store_output(&filename, audio).await;
        let assembled = self.assembler.merge_direct(Fragment { index: 0, audio });

        Ok(self.artifact_of(document, assembled, filename, 1, Vec::new()))
    }

    /// Chunked path: split, synthesize each chunk with pacing, merge
    async fn run_chunked(
        &self,
        progress: &mut Progress,
        document: &Document,
        workspace: &Arc<Workspace>,
    ) -> Result<OutputArtifact, NarrationError> {
        self.advance(progress, PipelineStage::Chunking, workspace)
            .await;
        let chunks = chunker::split(
            &document.text,
            self.settings.chunk_max_chars,
            self.settings.chunk_max_bytes,
        );
        if chunks.is_empty() {
            return Err(NarrationError::NoText);
        }

        tracing::info!(
            workspace_id = %workspace.id(),
            chunks_count = chunks.len(),
            chunk_max_chars = self.settings.chunk_max_chars,
            chunk_max_bytes = self.settings.chunk_max_bytes,
            "Text split into chunks"
        );

        self.advance(progress, PipelineStage::Synthesizing, workspace)
            .await;
        let (mut fragments, failed) = self
            .synthesize_chunks(&chunks, document, workspace)
            .await?;

        self.advance(progress, PipelineStage::Assembling, workspace)
            .await;
        let filename = self.output_name(document);
        let assembled = if chunks.len() == 1 {
            self.assembler.merge_direct(fragments.remove(0))
        } else {
            self.assembler
                .merge_blockwise(&fragments, workspace, &filename)
                .await?
        };

        Ok(self.artifact_of(document, assembled, filename, chunks.len(), failed))
    }

    /// Synthesize chunks strictly in order. Failed chunks are recorded and
    /// left out; it is an error only when none succeeds.
    async fn synthesize_chunks(
        &self,
        chunks: &[String],
        document: &Document,
        workspace: &Arc<Workspace>,
    ) -> Result<(Vec<Fragment>, Vec<usize>), NarrationError> {
        let extension = self.synthesis.encoding().extension();
        let mut throttle = Throttle::new(self.timer.clone(), self.settings.synthesis_delay);
        let mut fragments = Vec::with_capacity(chunks.len());
        let mut failed = Vec::new();
        let mut last_error: Option<SynthesisError> = None;

        for (index, chunk) in chunks.iter().enumerate() {
            throttle.ready().await;

            match self.synthesis.synthesize(chunk, &document.voice).await {
                Ok(audio) => {
                    let audio = workspace.store_fragment(index, extension, audio).await;
                    fragments.push(Fragment { index, audio });
                    tracing::debug!(
                        workspace_id = %workspace.id(),
                        chunk_index = index,
                        chunk_length = chunk.chars().count(),
                        "Chunk synthesized"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        workspace_id = %workspace.id(),
                        chunk_index = index,
                        error = %e,
                        "Chunk synthesis failed, leaving it out"
                    );
                    failed.push(index);
                    last_error = Some(e);
                }
            }

            self.workspaces.renew(workspace).await;
        }

        if fragments.is_empty() {
            let cause = last_error.map(|e| e.to_string()).unwrap_or_default();
            return Err(NarrationError::Synthesis(format!(
                "all {} chunks failed, last error: {}",
                chunks.len(),
                cause
            )));
        }

        Ok((fragments, failed))
    }

    /// Every path names and labels its output after the codec, so short and
    /// long documents come back in the same container
    fn output_name(&self, document: &Document) -> String {
        format!("{}.{}", document.stem, self.assembler.extension())
    }

    fn artifact_of(
        &self,
        document: &Document,
        assembled: AssembledAudio,
        filename: String,
        chunks_count: usize,
        failed_chunks: Vec<usize>,
    ) -> OutputArtifact {
        OutputArtifact {
            metadata: NarrationMetadata {
                filename,
                content_type: self.assembler.content_type().to_string(),
                voice: document.voice.name().to_string(),
                text_length: document.length,
                chunks_count,
                synthesized_chunks: chunks_count - failed_chunks.len(),
                failed_chunks,
                skipped_fragments: assembled.skipped,
                strategy: assembled.strategy,
                flushes: assembled.flushes,
                duration_seconds: assembled.duration.map(|d| d.as_secs_f64()),
                created_at: Utc::now(),
            },
            audio: assembled.audio,
        }
    }
}

/// Download name stem: the uploaded file's stem restricted to a safe
/// character set, `text` for pasted input
fn display_stem(filename: Option<&str>) -> String {
    filename
        .and_then(|name| Path::new(name).file_stem())
        .and_then(|stem| stem.to_str())
        .map(|stem| {
            stem.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                        c
                    } else {
                        '_'
                    }
                })
                .collect::<String>()
        })
        .map(|stem| stem.trim_matches(|c| c == '.' || c == '_').to_string())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| DEFAULT_STEM.to_string())
}
