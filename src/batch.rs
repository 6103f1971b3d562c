//! 批量处理：扫描目录中的视频，逐个分析并写出 JSON 与汇总表
//!
//! 顺序执行，不并发，不支持断点续跑。单个文件失败只会在汇总表中记一行错误。

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

use crate::analyzer::{analyze_video, AnalysisResult, VideoAsset};
use crate::gemini::ContentGenerator;
use crate::media::{guess_video_mime, is_video_file};
use crate::recipe::{structure_response, RecipeRecord};
use crate::report::{write_report, ReportRow, RowStatus};

/// 单个目录的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub dir: PathBuf,
    pub report_path: PathBuf,
    pub rows: Vec<ReportRow>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.status == RowStatus::Success)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.rows.len() - self.succeeded()
    }
}

/// 列出目录下（不递归）的视频文件，按路径字典序排序
pub fn discover_videos(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("读取目录失败: {}", dir.display()))?;

    let mut videos = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("读取目录项失败: {}", dir.display()))?
            .path();
        if path.is_file() && is_video_file(&path) {
            videos.push(path);
        }
    }
    videos.sort();
    Ok(videos)
}

/// 单个视频对应的 JSON 文件：`<stem>_recipe.json`
pub fn recipe_json_path(video_path: &Path) -> PathBuf {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    video_path.with_file_name(format!("{}_recipe.json", stem))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_recipe_json(path: &Path, recipe: &RecipeRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(recipe).context("序列化菜谱失败")?;
    std::fs::write(path, json).with_context(|| format!("写入 JSON 失败: {}", path.display()))
}

/// 处理单个视频，总是返回一行汇总
async fn process_video_file(
    generator: &dyn ContentGenerator,
    video_path: &Path,
    prompt: &str,
) -> ReportRow {
    let video_name = file_name(video_path);

    let result = match tokio::fs::read(video_path).await {
        Ok(bytes) => {
            let asset = VideoAsset::new(bytes, Some(guess_video_mime(video_path)));
            analyze_video(generator, &asset, prompt).await
        }
        Err(e) => AnalysisResult::Failure(e.to_string()),
    };

    let raw_text = match result {
        AnalysisResult::Success(text) => text,
        AnalysisResult::Failure(message) => {
            println!("✗ Error: {}", message);
            return ReportRow::error(&video_name, &message);
        }
    };

    let mut recipe = structure_response(&raw_text);
    recipe.video_file = Some(video_name.clone());
    recipe.video_path = Some(video_path.to_string_lossy().into_owned());

    let json_path = recipe_json_path(video_path);
    if let Err(e) = write_recipe_json(&json_path, &recipe) {
        error!("❌ [批量处理] {:#}", e);
        println!("✗ Error: {:#}", e);
        return ReportRow::error(&video_name, &format!("{:#}", e));
    }
    println!("✓ Saved JSON: {}", file_name(&json_path));

    ReportRow::success(&video_name, &recipe)
}

/// 处理一个目录。没有视频文件时返回 `None` 且不写任何文件
pub async fn process_directory(
    generator: &dyn ContentGenerator,
    dir: &Path,
    prompt: &str,
) -> Result<Option<BatchSummary>> {
    let videos = discover_videos(dir)?;
    if videos.is_empty() {
        println!("No video files found in {}", dir.display());
        return Ok(None);
    }

    let start = Instant::now();
    println!("Found {} video files to process", videos.len());
    info!("📁 [批量处理] 目录 {}: {} 个视频", dir.display(), videos.len());

    let mut rows = Vec::with_capacity(videos.len());
    for (i, video_path) in videos.iter().enumerate() {
        println!("\nProcessing {}/{}: {}", i + 1, videos.len(), file_name(video_path));
        rows.push(process_video_file(generator, video_path, prompt).await);
    }

    let report_path = write_report(dir, &rows)?;
    let summary = BatchSummary {
        dir: dir.to_path_buf(),
        report_path,
        rows,
    };

    println!("\n✓ Processing complete!");
    println!("✓ CSV results saved to: {}", summary.report_path.display());
    println!("✓ Individual JSON files saved in: {}", dir.display());
    info!(
        "✅ [批量处理] 目录 {} 完成: 成功 {} 个，失败 {} 个，耗时 {:.2}秒",
        dir.display(),
        summary.succeeded(),
        summary.failed(),
        start.elapsed().as_secs_f64()
    );

    Ok(Some(summary))
}

/// 目录级失败（无法列出目录、无法写汇总表）只记录日志，不影响后续目录
async fn process_directory_logged(
    generator: &dyn ContentGenerator,
    dir: &Path,
    prompt: &str,
) -> Option<BatchSummary> {
    match process_directory(generator, dir, prompt).await {
        Ok(summary) => summary,
        Err(e) => {
            warn!("⚠️ [批量处理] 目录 {} 处理失败: {:#}", dir.display(), e);
            println!("Error: {:#}", e);
            None
        }
    }
}

/// 依次处理多个目录；第一个目录必须存在，其余目录不存在时跳过
pub async fn run_batch(
    generator: &dyn ContentGenerator,
    dirs: &[PathBuf],
    prompt: &str,
) -> Result<Vec<BatchSummary>> {
    let (primary, extra) = dirs
        .split_first()
        .context("至少需要指定一个视频目录")?;

    if !primary.is_dir() {
        anyhow::bail!("Main folder not found: {}", primary.display());
    }

    let mut summaries = Vec::new();
    println!("Starting batch processing of videos in: {}", primary.display());
    summaries.extend(process_directory_logged(generator, primary, prompt).await);

    for dir in extra {
        if !dir.is_dir() {
            warn!("目录不存在，跳过: {}", dir.display());
            println!("Warning: folder not found: {}", dir.display());
            continue;
        }
        println!("\n{}", "=".repeat(60));
        println!("Starting batch processing of videos in: {}", dir.display());
        println!("{}", "=".repeat(60));
        summaries.extend(process_directory_logged(generator, dir, prompt).await);
    }

    Ok(summaries)
}
