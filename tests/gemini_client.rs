use serde_json::{json, Value};
use std::io::Write;
use std::time::Duration;
use video_recipe::{ContentGenerator, GeminiClient, GeminiConfig, GeminiError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn client_for(server: &MockServer) -> GeminiClient {
    let mut config = GeminiConfig::new("test-key");
    config.base_url = server.uri();
    config.file_poll_interval = Duration::from_millis(10);
    config.file_ready_timeout = Duration::from_secs(5);
    GeminiClient::new(config).unwrap()
}

fn text_response(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }]
    }))
}

async fn request_bodies(server: &MockServer, request_path: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == request_path)
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn inline_request_carries_base64_video_and_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(text_response("{\"recipe_name\": \"Soup\"}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let text = client
        .generate_inline(b"abc", "video/webm", "Extract the recipe.")
        .await
        .unwrap();
    assert_eq!(text, "{\"recipe_name\": \"Soup\"}");

    let bodies = request_bodies(&server, GENERATE_PATH).await;
    let parts = &bodies[0]["contents"][0]["parts"];
    assert_eq!(parts[0]["inlineData"]["mimeType"], "video/webm");
    assert_eq!(parts[0]["inlineData"]["data"], "YWJj");
    assert_eq!(parts[1]["text"], "Extract the recipe.");
}

#[tokio::test]
async fn api_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .generate_inline(b"abc", "video/mp4", "prompt")
        .await
        .unwrap_err();

    match err {
        GeminiError::Api { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "API key not valid");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn upload_waits_for_active_state_then_generates_from_file() {
    let server = MockServer::start().await;
    let session_url = format!("{}/upload-session/1", server.uri());
    let file_uri = format!("{}/v1beta/files/abc", server.uri());

    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .and(header("x-goog-upload-protocol", "resumable"))
        .and(header("x-goog-upload-command", "start"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("x-goog-upload-url", session_url.as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload-session/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file": {
                "name": "files/abc",
                "uri": file_uri,
                "mimeType": "video/quicktime",
                "state": "PROCESSING"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/files/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "files/abc",
            "uri": file_uri,
            "mimeType": "video/quicktime",
            "state": "ACTIVE"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(text_response("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let mut tmp = tempfile::Builder::new().suffix(".mov").tempfile().unwrap();
    tmp.write_all(b"large video bytes").unwrap();

    let client = client_for(&server);
    let file = client.upload_file(tmp.path(), "video/quicktime").await.unwrap();
    assert_eq!(file.name, "files/abc");
    assert_eq!(file.state.as_deref(), Some("ACTIVE"));

    let text = client.generate_from_file(&file, "prompt").await.unwrap();
    assert_eq!(text, "{}");

    let requests = server.received_requests().await.unwrap();
    let upload = requests
        .iter()
        .find(|r| r.url.path() == "/upload-session/1")
        .unwrap();
    assert_eq!(upload.body, b"large video bytes");

    let bodies = request_bodies(&server, GENERATE_PATH).await;
    let parts = &bodies[0]["contents"][0]["parts"];
    assert_eq!(parts[0]["fileData"]["fileUri"], file_uri);
    assert_eq!(parts[0]["fileData"]["mimeType"], "video/quicktime");
    assert_eq!(parts[1]["text"], "prompt");
}

#[tokio::test]
async fn failed_file_processing_is_an_error() {
    let server = MockServer::start().await;
    let session_url = format!("{}/upload-session/2", server.uri());

    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("x-goog-upload-url", session_url.as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload-session/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file": { "name": "files/bad", "uri": "u", "mimeType": "video/mp4", "state": "FAILED" }
        })))
        .mount(&server)
        .await;

    let tmp = tempfile::NamedTempFile::new().unwrap();
    let err = client_for(&server)
        .upload_file(tmp.path(), "video/mp4")
        .await
        .unwrap_err();

    assert!(matches!(err, GeminiError::FileProcessing { ref state, .. } if state == "FAILED"));
}

#[tokio::test]
async fn missing_upload_url_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let tmp = tempfile::NamedTempFile::new().unwrap();
    let err = client_for(&server)
        .upload_file(tmp.path(), "video/mp4")
        .await
        .unwrap_err();

    assert!(matches!(err, GeminiError::Upload(_)));
}
