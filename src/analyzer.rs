use std::time::Instant;
use tracing::{error, info};

use crate::error::GeminiResult;
use crate::gemini::ContentGenerator;
use crate::media::{suffix_for_mime, DEFAULT_VIDEO_MIME};

/// 内联发送的上限：达到或超过 20 MiB 走上传通道
pub const INLINE_LIMIT_BYTES: usize = 20 * 1024 * 1024;

/// 一次分析的视频内容
#[derive(Debug, Clone)]
pub struct VideoAsset {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl VideoAsset {
    /// `mime_type` 为空时使用 `video/mp4`
    pub fn new(bytes: Vec<u8>, mime_type: Option<&str>) -> Self {
        let mime_type = mime_type
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_VIDEO_MIME)
            .to_string();
        Self { bytes, mime_type }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// 发送视频的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Inline,
    Upload,
}

impl Transport {
    pub fn for_len(len: usize) -> Self {
        if len < INLINE_LIMIT_BYTES {
            Transport::Inline
        } else {
            Transport::Upload
        }
    }
}

/// 单次分析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisResult {
    Success(String),
    Failure(String),
}

impl AnalysisResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResult::Success(_))
    }
}

/// 把视频发送给分析服务，所有错误都转换为 [`AnalysisResult::Failure`]
pub async fn analyze_video(
    generator: &dyn ContentGenerator,
    asset: &VideoAsset,
    prompt: &str,
) -> AnalysisResult {
    let transport = Transport::for_len(asset.len());
    let start = Instant::now();
    info!(
        "🎬 [视频分析] {} 字节, 类型 {}, 通道 {:?}",
        asset.len(),
        asset.mime_type,
        transport
    );

    let outcome = match transport {
        Transport::Inline => {
            generator
                .generate_inline(&asset.bytes, &asset.mime_type, prompt)
                .await
        }
        Transport::Upload => analyze_via_upload(generator, asset, prompt).await,
    };

    match outcome {
        Ok(text) => {
            info!(
                "✅ [视频分析] 完成，耗时: {:.2}秒，响应 {} 字符",
                start.elapsed().as_secs_f64(),
                text.chars().count()
            );
            AnalysisResult::Success(text)
        }
        Err(e) => {
            error!("❌ [视频分析] 失败: {}", e);
            AnalysisResult::Failure(e.to_string())
        }
    }
}

/// 临时文件在函数返回时删除，成功和失败路径都一样
async fn analyze_via_upload(
    generator: &dyn ContentGenerator,
    asset: &VideoAsset,
    prompt: &str,
) -> GeminiResult<String> {
    let tmp = tempfile::Builder::new()
        .prefix("video-recipe-")
        .suffix(suffix_for_mime(&asset.mime_type))
        .tempfile()?;
    tokio::fs::write(tmp.path(), &asset.bytes).await?;

    let file = generator.upload_file(tmp.path(), &asset.mime_type).await?;
    generator.generate_from_file(&file, prompt).await
}
