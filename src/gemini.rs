//! Gemini 客户端
//!
//! 只实现本项目需要的三个 REST 调用：
//! - `models/{model}:generateContent`（内联视频或引用已上传文件）
//! - Files API 的 resumable 上传
//! - 查询已上传文件的处理状态
//!
//! 凭证通过 [`GeminiConfig`] 显式传入，不依赖任何进程级环境变量。

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as base64_engine;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{GeminiError, GeminiResult};

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// 视频分析服务抽象
///
/// [`GeminiClient`] 是生产实现；分析流程、HTTP handler 与批量处理只依赖这个 trait。
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// 视频字节随请求内联发送
    async fn generate_inline(
        &self,
        video: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> GeminiResult<String>;

    /// 把本地文件上传为远程文件句柄
    async fn upload_file(&self, path: &Path, mime_type: &str) -> GeminiResult<UploadedFile>;

    /// 引用已上传文件生成内容
    async fn generate_from_file(&self, file: &UploadedFile, prompt: &str) -> GeminiResult<String>;
}

/// Gemini 客户端配置
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// 单次 HTTP 请求超时
    pub request_timeout: Duration,
    /// 轮询文件状态的间隔
    pub file_poll_interval: Duration,
    /// 等待上传文件变为 ACTIVE 的最长时间
    pub file_ready_timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(600),
            file_poll_interval: Duration::from_secs(2),
            file_ready_timeout: Duration::from_secs(300),
        }
    }
}

/// Files API 返回的文件句柄
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// 形如 `files/abc123`
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub state: Option<String>,
}

impl UploadedFile {
    fn is_active(&self) -> bool {
        matches!(self.state.as_deref(), None | Some("ACTIVE"))
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    Text(String),
    InlineData(InlineData),
    FileData(FileData),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadStartRequest {
    file: UploadMetadata,
}

#[derive(Debug, Serialize)]
struct UploadMetadata {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct UploadFinalizeResponse {
    file: UploadedFile,
}

impl GenerateResponse {
    /// 拼接第一个候选的所有文本片段
    fn into_text(self) -> GeminiResult<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GeminiError::Blocked(reason));
        }

        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GeminiError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Gemini REST 客户端
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> GeminiResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        self.config.model.trim_start_matches("models/")
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn generate_url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url(), self.model())
    }

    async fn generate(&self, parts: Vec<Part>) -> GeminiResult<String> {
        let request = GenerateRequest {
            contents: vec![Content { parts }],
        };

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let response = check_status(response).await?;
        let body: GenerateResponse = response.json().await?;
        body.into_text()
    }

    /// 查询文件当前状态
    pub async fn get_file(&self, name: &str) -> GeminiResult<UploadedFile> {
        let url = format!("{}/v1beta/{}", self.base_url(), name);
        let response = self
            .client
            .get(url)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// 视频上传后需要服务端处理，轮询直到 ACTIVE
    async fn wait_until_active(&self, mut file: UploadedFile) -> GeminiResult<UploadedFile> {
        let deadline = Instant::now() + self.config.file_ready_timeout;

        while !file.is_active() {
            if let Some(state @ "FAILED") = file.state.as_deref() {
                return Err(GeminiError::FileProcessing {
                    name: file.name.clone(),
                    state: state.to_string(),
                });
            }
            if Instant::now() >= deadline {
                return Err(GeminiError::FileTimeout(file.name));
            }
            debug!("等待文件处理: {} state={:?}", file.name, file.state);
            tokio::time::sleep(self.config.file_poll_interval).await;
            file = self.get_file(&file.name).await?;
        }

        Ok(file)
    }
}

async fn check_status(response: reqwest::Response) -> GeminiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GeminiError::Api {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate_inline(
        &self,
        video: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> GeminiResult<String> {
        info!("Gemini 内联请求: model={}, {} 字节", self.model(), video.len());
        self.generate(vec![
            Part::InlineData(InlineData {
                mime_type: mime_type.to_string(),
                data: base64_engine.encode(video),
            }),
            Part::Text(prompt.to_string()),
        ])
        .await
    }

    async fn upload_file(&self, path: &Path, mime_type: &str) -> GeminiResult<UploadedFile> {
        let bytes = tokio::fs::read(path).await?;
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        info!("上传文件到 Gemini: {} ({} 字节)", display_name, bytes.len());

        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url()))
            .header("x-goog-api-key", &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&UploadStartRequest {
                file: UploadMetadata { display_name },
            })
            .send()
            .await?;
        let start = check_status(start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| GeminiError::upload("missing x-goog-upload-url header"))?;

        let finalize = self
            .client
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;
        let finalize = check_status(finalize).await?;
        let uploaded: UploadFinalizeResponse = finalize.json().await?;

        info!("文件已上传: {} ({})", uploaded.file.name, uploaded.file.uri);
        self.wait_until_active(uploaded.file).await
    }

    async fn generate_from_file(&self, file: &UploadedFile, prompt: &str) -> GeminiResult<String> {
        info!("Gemini 文件请求: model={}, file={}", self.model(), file.name);
        self.generate(vec![
            Part::FileData(FileData {
                mime_type: file.mime_type.clone(),
                file_uri: file.uri.clone(),
            }),
            Part::Text(prompt.to_string()),
        ])
        .await
    }
}
