use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::Json as ResponseJson,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::analyzer::{analyze_video, AnalysisResult, VideoAsset};
use crate::gemini::ContentGenerator;

/// 上传表单中的文件字段名
pub const UPLOAD_FIELD: &str = "file";

/// Handler 共享状态，请求之间不可变
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn ContentGenerator>,
    pub prompt: Arc<str>,
}

impl AppState {
    pub fn new(generator: Arc<dyn ContentGenerator>, prompt: impl Into<Arc<str>>) -> Self {
        Self {
            generator,
            prompt: prompt.into(),
        }
    }
}

/// `/analyze` 的响应体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AnalyzeResponse {
    Success { gemini_response: String },
    Error { error: String },
}

type AnalyzeReply = (StatusCode, ResponseJson<AnalyzeResponse>);

fn error_reply(status: StatusCode, error: impl Into<String>) -> AnalyzeReply {
    (
        status,
        ResponseJson(AnalyzeResponse::Error {
            error: error.into(),
        }),
    )
}

struct Upload {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// 取第一个名为 `file` 的字段
async fn read_upload(mut multipart: Multipart) -> Result<Option<Upload>, String> {
    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| e.body_text())?;
        return Ok(Some(Upload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

/// 分析上传视频的 Handler，总是返回 JSON
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AnalyzeReply {
    let multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            warn!("无效的上传请求: {}", rejection.body_text());
            return error_reply(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let upload = match read_upload(multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return error_reply(StatusCode::BAD_REQUEST, "No file provided"),
        Err(e) => {
            warn!("读取上传文件失败: {}", e);
            return error_reply(StatusCode::BAD_REQUEST, e);
        }
    };

    info!(
        "收到视频分析请求: file={:?}, {} 字节, content_type={:?}",
        upload.file_name,
        upload.bytes.len(),
        upload.content_type
    );

    let asset = VideoAsset::new(upload.bytes, upload.content_type.as_deref());
    match analyze_video(state.generator.as_ref(), &asset, &state.prompt).await {
        AnalysisResult::Success(text) => (
            StatusCode::OK,
            ResponseJson(AnalyzeResponse::Success {
                gemini_response: text,
            }),
        ),
        AnalysisResult::Failure(message) => {
            error!("视频分析失败: {}", message);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}

/// 健康检查 Handler
pub async fn health_check() -> &'static str {
    "OK"
}
