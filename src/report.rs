use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::recipe::RecipeRecord;

/// 每个目录生成的汇总表文件名
pub const REPORT_FILE_NAME: &str = "recipe_analysis_results.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Success,
    Error,
}

/// 汇总表中的一行，字段顺序即列顺序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub video_file: String,
    pub recipe_name: String,
    pub ingredients: String,
    pub method: String,
    pub serving_size: String,
    pub additional_notes: String,
    pub status: RowStatus,
}

impl ReportRow {
    pub fn success(video_file: &str, recipe: &RecipeRecord) -> Self {
        Self {
            video_file: video_file.to_string(),
            recipe_name: recipe.recipe_name.clone(),
            ingredients: list_cell(&recipe.ingredients),
            method: list_cell(&recipe.method),
            serving_size: recipe.serving_size.clone(),
            additional_notes: recipe.additional_notes.clone(),
            status: RowStatus::Success,
        }
    }

    pub fn error(video_file: &str, message: &str) -> Self {
        Self {
            video_file: video_file.to_string(),
            recipe_name: String::new(),
            ingredients: String::new(),
            method: String::new(),
            serving_size: String::new(),
            additional_notes: format!("Error: {}", message),
            status: RowStatus::Error,
        }
    }
}

/// 列表列写成紧凑的 JSON 数组
fn list_cell(items: &[Value]) -> String {
    serde_json::to_string(items).unwrap_or_default()
}

/// 一次性写出整个汇总表（含表头）
pub fn write_report(dir: &Path, rows: &[ReportRow]) -> Result<PathBuf> {
    let path = dir.join(REPORT_FILE_NAME);
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("创建汇总表失败: {}", path.display()))?;

    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("写入汇总表失败: {}", row.video_file))?;
    }
    writer.flush().context("写入汇总表失败")?;

    Ok(path)
}
