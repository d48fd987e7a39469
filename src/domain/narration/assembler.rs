use crate::domain::workspace::{AssemblyStrategy, AudioBlob, Workspace};
use crate::infrastructure::audio::{AudioCodec, CodecError, PcmBuffer};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("no fragment could be merged")]
    NothingMerged,
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("cannot read flushed output: {0}")]
    Storage(#[from] std::io::Error),
}

/// Synthesized audio of one chunk, in chunk order
#[derive(Debug, Clone)]
pub struct Fragment {
    pub index: usize,
    pub audio: AudioBlob,
}

/// Result of merging a request's fragments
#[derive(Debug, Clone)]
pub struct AssembledAudio {
    pub audio: AudioBlob,
    pub strategy: AssemblyStrategy,
    pub merged: usize,
    pub skipped: Vec<usize>,
    pub flushes: usize,
    pub duration: Option<Duration>,
}

/// Progress of a block-wise merge
#[derive(Debug, Default)]
struct AssemblyState {
    flushed: Option<AudioBlob>,
    cursor: usize,
    merged: usize,
    skipped: Vec<usize>,
    flushes: usize,
    duration: Duration,
}

/// Joins fragments into one stream while holding at most one block of
/// decoded fragments in memory.
///
/// Decoding and encoding run on the blocking pool, off the async workers.
pub struct Assembler {
    codec: Arc<dyn AudioCodec>,
    block_size: usize,
}

impl Assembler {
    pub fn new(codec: Arc<dyn AudioCodec>, block_size: usize) -> Self {
        Self {
            codec,
            block_size: block_size.max(1),
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.codec.content_type()
    }

    pub fn extension(&self) -> &'static str {
        self.codec.extension()
    }

    /// A lone fragment is the output as is, no decode or re-encode
    pub fn merge_direct(&self, fragment: Fragment) -> AssembledAudio {
        AssembledAudio {
            audio: fragment.audio,
            strategy: AssemblyStrategy::Direct,
            merged: 1,
            skipped: Vec::new(),
            flushes: 0,
            duration: None,
        }
    }

    /// Merge fragments block by block.
    ///
    /// After every block the running result is encoded and written to
    /// `output_name` in the workspace; the next block starts by decoding that
    /// flushed output again. Fragments that cannot be read or decoded are
    /// skipped.
    pub async fn merge_blockwise(
        &self,
        fragments: &[Fragment],
        workspace: &Workspace,
        output_name: &str,
    ) -> Result<AssembledAudio, AssemblyError> {
        let mut state = AssemblyState::default();

        for (block_index, block) in fragments.chunks(self.block_size).enumerate() {
            self.merge_block(block, &mut state, workspace, output_name)
                .await?;

            tracing::info!(
                workspace_id = %workspace.id(),
                block_index,
                cursor = state.cursor,
                merged = state.merged,
                skipped = state.skipped.len(),
                flushes = state.flushes,
                "Block merged"
            );
        }

        let audio = state.flushed.ok_or(AssemblyError::NothingMerged)?;

        Ok(AssembledAudio {
            audio,
            strategy: AssemblyStrategy::Blockwise,
            merged: state.merged,
            skipped: state.skipped,
            flushes: state.flushes,
            duration: Some(state.duration),
        })
    }

    async fn merge_block(
        &self,
        block: &[Fragment],
        state: &mut AssemblyState,
        workspace: &Workspace,
        output_name: &str,
    ) -> Result<(), AssemblyError> {
        // Decoded audio of this block never outlives this call
        let mut running: Option<PcmBuffer> = None;
        let mut merged_in_block = 0;

        for fragment in block {
            state.cursor += 1;

            let decoded = match self.decode_fragment(fragment).await {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!(
                        workspace_id = %workspace.id(),
                        fragment_index = fragment.index,
                        error = %e,
                        "Skipping fragment that cannot be decoded"
                    );
                    state.skipped.push(fragment.index);
                    continue;
                }
            };

            if running.is_none() {
                if let Some(flushed) = &state.flushed {
                    running = Some(self.decode(flushed.read().await?).await?);
                }
            }

            if let Some(head) = running.as_mut() {
                if let Err(e) = self.codec.concatenate(head, decoded) {
                    tracing::warn!(
                        workspace_id = %workspace.id(),
                        fragment_index = fragment.index,
                        error = %e,
                        "Skipping fragment with a different audio format"
                    );
                    state.skipped.push(fragment.index);
                    continue;
                }
            } else {
                running = Some(decoded);
            }

            merged_in_block += 1;
        }

        let Some(buffer) = running.filter(|_| merged_in_block > 0) else {
            return Ok(());
        };

        state.duration = buffer.duration();
        let encoded = self.encode(buffer).await?;

        state.flushed = Some(workspace.store_output(output_name, encoded).await);
        state.flushes += 1;
        state.merged += merged_in_block;

        Ok(())
    }

    async fn decode_fragment(&self, fragment: &Fragment) -> Result<PcmBuffer, AssemblyError> {
        let bytes = fragment.audio.read().await?;
        Ok(self.decode(bytes).await?)
    }

    async fn decode(&self, bytes: Bytes) -> Result<PcmBuffer, CodecError> {
        let codec = self.codec.clone();
        tokio::task::spawn_blocking(move || codec.decode(&bytes))
            .await
            .map_err(|e| CodecError::Decode(format!("decode task failed: {}", e)))?
    }

    /// Consumes the buffer so it is freed on the blocking thread
    async fn encode(&self, buffer: PcmBuffer) -> Result<Bytes, CodecError> {
        let codec = self.codec.clone();
        tokio::task::spawn_blocking(move || codec.encode(&buffer))
            .await
            .map_err(|e| CodecError::Encode(format!("encode task failed: {}", e)))?
    }
}
