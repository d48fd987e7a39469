use crate::e2e::helpers;

use helpers::{mp3_seconds, sentences, wav_samples, Mp3TestContext, TestContext, SAMPLES_PER_CHAR};
use hyper::StatusCode;
use serde_json::json;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_narrate_short_text_in_one_call(ctx: &TestContext) {
    let text = sentences(2);

    let response = ctx
        .client
        .post(
            "/api/narrations",
            &json!({ "text": text, "voice": "en-US-Standard-C" }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::CREATED);
    let body = response.body.as_ref().unwrap();
    assert_eq!(body["chunks_count"], 1);
    assert_eq!(body["strategy"], "direct");
    assert_eq!(body["filename"], "text.wav");
    assert_eq!(body["content_type"], "audio/wav");
    assert_eq!(body["voice"], "en-US-Standard-C");
    assert_eq!(body["text_length"], text.chars().count());
    assert!(body["workspace_id"].as_str().is_some());

    assert_eq!(ctx.tts.calls(), 1);
    assert_eq!(ctx.tts.requests()[0].text, text);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_chunk_long_text_and_merge_in_blocks(ctx: &TestContext) {
    let text = sentences(10);

    let response = ctx
        .client
        .post(
            "/api/narrations",
            &json!({ "text": text, "voice": "en-US-Standard-C", "filename": "chapter-1.txt" }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::CREATED);
    let body = response.body.as_ref().unwrap();
    assert_eq!(body["chunks_count"], 4);
    assert_eq!(body["synthesized_chunks"], 4);
    assert_eq!(body["strategy"], "blockwise");
    assert_eq!(body["flushes"], 2);
    assert_eq!(body["filename"], "chapter-1.wav");

    let requests = ctx.tts.requests();
    assert_eq!(requests.len(), 4);
    for request in &requests {
        assert!(request.text.chars().count() <= ctx.config.chunk_max_chars);
    }
    // Chunks carry every sentence, in order
    let rejoined: Vec<String> = requests.into_iter().map(|r| r.text).collect();
    assert_eq!(rejoined.join(" "), text);

    let id = body["workspace_id"].as_str().unwrap();
    let audio = ctx
        .client
        .get(&format!("/api/narrations/{}/play", id))
        .await
        .unwrap();
    audio.assert_status(StatusCode::OK);
    audio.assert_header("content-type", "audio/wav");

    let total_chars: usize = rejoined.iter().map(|t| t.chars().count()).sum();
    assert_eq!(
        wav_samples(&audio.body_bytes).unwrap() as usize,
        total_chars * SAMPLES_PER_CHAR
    );
}

#[test_context(Mp3TestContext)]
#[tokio::test]
async fn it_should_serve_mp3_for_short_and_long_texts(ctx: &Mp3TestContext) {
    let ctx = &ctx.0;
    let mut outputs = Vec::new();

    for text in [sentences(2), sentences(10)] {
        let response = ctx
            .client
            .post(
                "/api/narrations",
                &json!({ "text": text, "voice": "en-US-Standard-C" }),
            )
            .await
            .unwrap();

        response.assert_status(StatusCode::CREATED);
        let body = response.body.as_ref().unwrap();
        assert_eq!(body["content_type"], "audio/mpeg");
        assert_eq!(body["filename"], "text.mp3");

        let id = body["workspace_id"].as_str().unwrap();
        let audio = ctx
            .client
            .get(&format!("/api/narrations/{}/play", id))
            .await
            .unwrap();
        audio
            .assert_status(StatusCode::OK)
            .assert_header("content-type", "audio/mpeg");

        outputs.push((
            body["strategy"].as_str().unwrap().to_string(),
            mp3_seconds(&audio.body_bytes).unwrap(),
        ));
    }

    assert_eq!(outputs[0].0, "direct");
    assert_eq!(outputs[1].0, "blockwise");
    // Ten sentences of audio against two
    assert!(outputs[1].1 > outputs[0].1 * 2.0, "{:?}", outputs);
    for request in ctx.tts.requests() {
        assert_eq!(request.encoding.as_str(), "MP3");
    }
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_report_failed_chunks_and_still_deliver(ctx: &TestContext) {
    // Chunks: three sentences | the failing one and two more | the last one
    let text = format!("{} FAIL this sentence on purpose. {}", sentences(3), sentences(3));

    let response = ctx
        .client
        .post(
            "/api/narrations",
            &json!({ "text": text, "voice": "en-US-Standard-C" }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::CREATED);
    let body = response.body.as_ref().unwrap();
    assert_eq!(body["chunks_count"], 3);
    assert_eq!(body["synthesized_chunks"], 2);
    assert_eq!(body["failed_chunks"], json!([1]));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_fail_when_no_chunk_can_be_synthesized(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/api/narrations",
            &json!({ "text": "FAIL. FAIL again.", "voice": "en-US-Standard-C" }),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_GATEWAY)
        .assert_error_message("refused");

    ctx.workspaces.sweep().await;
    assert_eq!(ctx.workspaces.live_count(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_download_as_attachment(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/api/narrations",
            &json!({ "text": "Hello. World.", "voice": "de-DE-Standard-A", "filename": "notes.md" }),
        )
        .await
        .unwrap();
    response.assert_status(StatusCode::CREATED);
    let id = response.body.as_ref().unwrap()["workspace_id"]
        .as_str()
        .unwrap()
        .to_string();

    let download = ctx
        .client
        .get(&format!("/api/narrations/{}/download", id))
        .await
        .unwrap();

    download
        .assert_status(StatusCode::OK)
        .assert_header("content-disposition", "attachment; filename=\"notes.wav\"")
        .assert_header("x-chunks-count", "1");
    assert!(wav_samples(&download.body_bytes).unwrap() > 0);

    let play = ctx
        .client
        .get(&format!("/api/narrations/{}/play", id))
        .await
        .unwrap();
    play.assert_status(StatusCode::OK)
        .assert_header("content-disposition", "inline; filename=\"notes.wav\"");
    assert_eq!(play.body_bytes, download.body_bytes);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_metadata_for_a_narration(ctx: &TestContext) {
    let created = ctx
        .client
        .post(
            "/api/narrations",
            &json!({ "text": sentences(10), "voice": "en-US-Wavenet-F" }),
        )
        .await
        .unwrap();
    let id = created.body.as_ref().unwrap()["workspace_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = ctx
        .client
        .get(&format!("/api/narrations/{}", id))
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    let body = response.body.as_ref().unwrap();
    assert_eq!(body["workspace_id"], id.as_str());
    assert_eq!(body["voice"], "en-US-Wavenet-F");
    assert!(body["duration_seconds"].as_f64().unwrap() > 0.0);
    assert!(body["created_at"].as_str().is_some());

    // High-definition voices pin the encoding profile
    for request in ctx.tts.requests() {
        assert_eq!(request.profile.sample_rate_hertz, Some(24_000));
        assert_eq!(request.language_code, "en-US");
    }
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_release_a_narration_idempotently(ctx: &TestContext) {
    let created = ctx
        .client
        .post(
            "/api/narrations",
            &json!({ "text": sentences(4), "voice": "en-US-Standard-C" }),
        )
        .await
        .unwrap();
    created.assert_status(StatusCode::CREATED);
    let id = created.body.as_ref().unwrap()["workspace_id"]
        .as_str()
        .unwrap()
        .to_string();
    let dir = ctx.config.workspace_root.join(&id);
    assert!(dir.exists());

    ctx.client
        .delete(&format!("/api/narrations/{}", id))
        .await
        .unwrap()
        .assert_status(StatusCode::NO_CONTENT);
    assert!(!dir.exists());

    ctx.client
        .delete(&format!("/api/narrations/{}", id))
        .await
        .unwrap()
        .assert_status(StatusCode::NO_CONTENT);

    ctx.client
        .get(&format!("/api/narrations/{}/play", id))
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_invalid_input_without_calling_synthesis(ctx: &TestContext) {
    ctx.client
        .post("/api/narrations", &json!({ "text": "   ", "voice": "en-US-Standard-C" }))
        .await
        .unwrap()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("no text provided");

    ctx.client
        .post("/api/narrations", &json!({ "text": "Hello.", "voice": "Standard" }))
        .await
        .unwrap()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("invalid voice");

    ctx.client
        .post("/api/narrations", &json!({ "text": "Hello.", "voice": "es-ES-Standard-A" }))
        .await
        .unwrap()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("not offered");

    ctx.client
        .post(
            "/api/narrations",
            &json!({ "text": "a".repeat(5_001), "voice": "en-US-Standard-C" }),
        )
        .await
        .unwrap()
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE);

    assert_eq!(ctx.tts.calls(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_bodies_over_the_upload_limit(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/api/narrations",
            &json!({ "text": "a".repeat(20_000), "voice": "en-US-Standard-C" }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(ctx.tts.calls(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_not_found_for_unknown_narrations(ctx: &TestContext) {
    let id = uuid::Uuid::new_v4();

    ctx.client
        .get(&format!("/api/narrations/{}", id))
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);

    ctx.client
        .get(&format!("/api/narrations/{}/download", id))
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_list_offered_voices(ctx: &TestContext) {
    let response = ctx.client.get("/api/voices").await.unwrap();

    response.assert_status(StatusCode::OK);
    let voices = response.body.as_ref().unwrap()["voices"].as_array().unwrap();
    assert_eq!(voices.len(), 8);

    let wavenet = voices
        .iter()
        .find(|v| v["name"] == "en-US-Wavenet-F")
        .unwrap();
    assert_eq!(wavenet["tier"], "hd");
    assert_eq!(wavenet["language_code"], "en-US");

    let ukrainian = voices
        .iter()
        .find(|v| v["name"] == "uk-UA-Standard-A")
        .unwrap();
    assert_eq!(ukrainian["tier"], "standard");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_serve_concurrent_requests_in_isolation(ctx: &TestContext) {
    let mut handles = Vec::new();
    for i in 0..4 {
        let client = ctx.client.clone();
        handles.push(tokio::spawn(async move {
            client
                .post(
                    "/api/narrations",
                    &json!({ "text": format!("Request {}. {}", i, sentences(6)), "voice": "en-US-Standard-C" }),
                )
                .await
                .unwrap()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let response = handle.await.unwrap();
        response.assert_status(StatusCode::CREATED);
        ids.push(
            response.body.as_ref().unwrap()["workspace_id"]
                .as_str()
                .unwrap()
                .to_string(),
        );
    }

    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}
