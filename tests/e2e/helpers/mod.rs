use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;
use narrator::controllers::narration::NarrationController;
use narrator::domain::narration::{NarrationService, TokioTimer, VoiceCatalog};
use narrator::domain::workspace::WorkspaceManager;
use narrator::infrastructure::audio::{codec_for, AudioCodec, Mp3Codec, PcmBuffer};
use narrator::infrastructure::config::Config;
use narrator::infrastructure::http::build_router;
use narrator::infrastructure::repositories::{
    AudioEncoding, SynthesisError, SynthesisRequest, TtsRepository,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;
use test_context::AsyncTestContext;
use tokio::net::TcpListener;


use api_client::TestClient;

/// Sample rate of every clip the fake synthesis service returns
pub const FAKE_SAMPLE_RATE: u32 = 8_000;

/// Samples rendered per character of input text
pub const SAMPLES_PER_CHAR: usize = 80;

/// Stands in for Google text:synthesize: answers in the requested container
/// (16-bit mono WAV or MP3) with audio whose length is proportional to the
/// text, and refuses text containing `FAIL`
#[derive(Default)]
pub struct FakeTts {
    requests: Mutex<Vec<SynthesisRequest>>,
}

impl FakeTts {
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl TtsRepository for FakeTts {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, SynthesisError> {
        self.requests.lock().push(request.clone());
        if request.text.contains("FAIL") {
            return Err(SynthesisError::Rejected("400 Bad Request: refused".to_string()));
        }
        let samples = request.text.chars().count() * SAMPLES_PER_CHAR;
        match request.encoding {
            AudioEncoding::Linear16 => Ok(wav_clip(samples)),
            AudioEncoding::Mp3 => Ok(mp3_clip(samples)),
        }
    }
}

fn clip_sample(i: usize) -> i16 {
    ((i % 64) as i16 - 32) * 256
}

/// A mono 16-bit WAV of `samples` samples
pub fn wav_clip(samples: usize) -> Bytes {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: FAKE_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..samples {
            writer.write_sample(clip_sample(i)).unwrap();
        }
        writer.finalize().unwrap();
    }
    Bytes::from(cursor.into_inner())
}

/// A mono MP3 of about `samples` samples
pub fn mp3_clip(samples: usize) -> Bytes {
    let buffer = PcmBuffer {
        sample_rate: FAKE_SAMPLE_RATE,
        channels: 1,
        samples: (0..samples)
            .map(|i| clip_sample(i) as f32 / i16::MAX as f32)
            .collect(),
    };
    Mp3Codec.encode(&buffer).unwrap()
}

pub struct TestContext {
    pub client: TestClient,
    pub config: Config,
    pub tts: Arc<FakeTts>,
    pub workspaces: Arc<WorkspaceManager>,
    _root: TempDir,
}

impl TestContext {
    async fn start(encoding: &str) -> Self {
        let root = tempfile::tempdir().expect("Failed to create workspace root");

        // Small limits so that chunking and block merging show up with short texts
        let vars: HashMap<&str, String> = HashMap::from([
            ("GOOGLE_TTS_API_KEY", "test-api-key".to_string()),
            ("HOST", "127.0.0.1".to_string()),
            ("PORT", "0".to_string()),
            ("SYNTHESIS_AUDIO_ENCODING", encoding.to_string()),
            ("MAX_TEXT_CHARS", "5000".to_string()),
            ("DIRECT_SYNTHESIS_MAX_CHARS", "100".to_string()),
            ("CHUNK_MAX_CHARS", "120".to_string()),
            ("MERGE_BLOCK_SIZE", "2".to_string()),
            ("SYNTHESIS_DELAY_MS", "0".to_string()),
            ("MAX_UPLOAD_BYTES", "16384".to_string()),
            ("WORKSPACE_ROOT", root.path().display().to_string()),
        ]);
        let config =
            Config::from_lookup(|key| vars.get(key).cloned()).expect("Failed to build test config");

        let tts = Arc::new(FakeTts::default());
        let (app, workspaces) = create_app(&config, tts.clone());

        // Start server
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = TestClient::new(&base_url);

        Self {
            client,
            config,
            tts,
            workspaces,
            _root: root,
        }
    }
}

/// Synthesis answers in 16-bit WAV
impl AsyncTestContext for TestContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        TestContext::start("linear16")
    }

    fn teardown(self) -> impl std::future::Future<Output = ()> + Send {
        async {
            // Workspace storage is removed when the temp dir drops
        }
    }
}

/// Same server, with synthesis and output in MP3
pub struct Mp3TestContext(pub TestContext);

impl AsyncTestContext for Mp3TestContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async { Mp3TestContext(TestContext::start("mp3").await) }
    }

    fn teardown(self) -> impl std::future::Future<Output = ()> + Send {
        async {}
    }
}

fn create_app(config: &Config, tts: Arc<FakeTts>) -> (Router, Arc<WorkspaceManager>) {
    let workspaces = Arc::new(WorkspaceManager::new(
        config.workspace_root.clone(),
        config.workspace_ttl(),
    ));
    let narration_service = Arc::new(NarrationService::new(
        workspaces.clone(),
        tts,
        codec_for(config.audio_encoding),
        Arc::new(TokioTimer),
        VoiceCatalog::new(&config.voices),
        config.narration_settings(),
    ));
    let narration_controller = Arc::new(NarrationController::new(narration_service));

    let app = build_router(
        workspaces.clone(),
        narration_controller,
        config.max_upload_bytes,
    );
    (app, workspaces)
}

/// Text of `sentences` sentences, each about 40 characters long
pub fn sentences(count: usize) -> String {
    (0..count)
        .map(|i| format!("Sentence number {:03} is right here.", i))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Number of samples in a WAV payload
pub fn wav_samples(bytes: &[u8]) -> Result<u32> {
    let reader = hound::WavReader::new(Cursor::new(bytes.to_vec()))?;
    Ok(reader.duration())
}

/// Duration in seconds of an MP3 payload
pub fn mp3_seconds(bytes: &[u8]) -> Result<f64> {
    Ok(Mp3Codec.decode(bytes)?.duration().as_secs_f64())
}
