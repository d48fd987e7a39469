use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

const UPLOAD_FILE: &str = "upload.txt";
const FRAGMENTS_DIR: &str = "fragments";
const OUTPUT_DIR: &str = "output";

/// Audio held either on disk or, when storage failed, in memory
#[derive(Debug, Clone)]
pub enum AudioBlob {
    File(PathBuf),
    Memory(Bytes),
}

impl AudioBlob {
    pub async fn read(&self) -> std::io::Result<Bytes> {
        match self {
            AudioBlob::File(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
            AudioBlob::Memory(bytes) => Ok(bytes.clone()),
        }
    }

    pub fn is_durable(&self) -> bool {
        matches!(self, AudioBlob::File(_))
    }
}

/// How the fragments of a request were turned into one stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyStrategy {
    Direct,
    Blockwise,
}

/// Facts about a finished narration, exposed next to the audio
#[derive(Debug, Clone, Serialize)]
pub struct NarrationMetadata {
    pub filename: String,
    pub content_type: String,
    pub voice: String,
    pub text_length: usize,
    pub chunks_count: usize,
    pub synthesized_chunks: usize,
    pub failed_chunks: Vec<usize>,
    pub skipped_fragments: Vec<usize>,
    pub strategy: AssemblyStrategy,
    /// Times the running output was encoded and written back to storage
    pub flushes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// The final audio of a request
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    pub audio: AudioBlob,
    pub metadata: NarrationMetadata,
}

/// Isolated storage and result slot for one request.
///
/// Everything lives under `<root>/<id>/`; directories are created on first
/// write. When a write fails the caller gets the bytes back as an in-memory
/// blob so the request can still finish.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    dir: PathBuf,
    artifact: RwLock<Option<Arc<OutputArtifact>>>,
    in_flight: AtomicBool,
}

/// Marks a workspace as in use by a running request until dropped.
///
/// Lease expiry never purges the storage of an in-flight workspace.
#[derive(Debug)]
pub struct InFlight(Arc<Workspace>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
    }
}

impl Workspace {
    pub(super) fn new(id: Uuid, root: &Path) -> Self {
        Self {
            id,
            dir: root.join(id.to_string()),
            artifact: RwLock::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn begin_run(self: &Arc<Self>) -> InFlight {
        self.in_flight.store(true, Ordering::Release);
        InFlight(self.clone())
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn upload_path(&self) -> PathBuf {
        self.dir.join(UPLOAD_FILE)
    }

    pub fn fragment_path(&self, index: usize, extension: &str) -> PathBuf {
        self.dir
            .join(FRAGMENTS_DIR)
            .join(format!("chunk_{:03}.{}", index, extension))
    }

    pub fn output_path(&self, filename: &str) -> PathBuf {
        self.dir.join(OUTPUT_DIR).join(filename)
    }

    /// Keep a copy of the submitted text
    pub async fn store_upload(&self, text: &str) -> std::io::Result<PathBuf> {
        let path = self.upload_path();
        write_file(&path, text.as_bytes()).await?;
        Ok(path)
    }

    /// Store the audio of one chunk
    pub async fn store_fragment(&self, index: usize, extension: &str, audio: Bytes) -> AudioBlob {
        let path = self.fragment_path(index, extension);
        self.store(path, audio).await
    }

    /// Store the (partial) output, replacing any earlier flush
    pub async fn store_output(&self, filename: &str, audio: Bytes) -> AudioBlob {
        let path = self.output_path(filename);
        self.store(path, audio).await
    }

    async fn store(&self, path: PathBuf, audio: Bytes) -> AudioBlob {
        match write_file(&path, &audio).await {
            Ok(()) => AudioBlob::File(path),
            Err(e) => {
                tracing::warn!(
                    workspace_id = %self.id,
                    path = %path.display(),
                    error = %e,
                    "Workspace storage unavailable, keeping audio in memory"
                );
                AudioBlob::Memory(audio)
            }
        }
    }

    /// Make the finished artifact visible to playback and download
    pub fn publish(&self, artifact: OutputArtifact) -> Arc<OutputArtifact> {
        let artifact = Arc::new(artifact);
        *self.artifact.write() = Some(artifact.clone());
        artifact
    }

    pub fn artifact(&self) -> Option<Arc<OutputArtifact>> {
        self.artifact.read().clone()
    }

    /// Drop the artifact handle and delete everything on disk
    pub(super) async fn release(&self) {
        self.artifact.write().take();
        remove_dir(&self.dir).await;
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await
}

pub(super) async fn remove_dir(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => tracing::debug!(dir = %dir.display(), "Workspace storage removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to remove workspace storage")
        }
    }
}
