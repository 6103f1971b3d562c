use std::path::Path;

/// 未提供类型时使用的默认 MIME
pub const DEFAULT_VIDEO_MIME: &str = "video/mp4";

/// 批量模式识别的视频扩展名（比较时忽略大小写）
pub const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "mov", "avi", "mkv", "wmv", "flv", "webm"];

/// 判断路径是否为支持的视频文件
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// 根据文件扩展名猜测视频 Content-Type
pub fn guess_video_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "webm" => "video/webm",
        _ => DEFAULT_VIDEO_MIME,
    }
}

/// 上传临时文件使用的后缀
pub fn suffix_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "video/quicktime" => ".mov",
        "video/x-msvideo" => ".avi",
        "video/x-matroska" => ".mkv",
        "video/x-ms-wmv" => ".wmv",
        "video/x-flv" => ".flv",
        "video/webm" => ".webm",
        _ => ".mp4",
    }
}
