pub mod analyzer;
pub mod batch;
pub mod config;
pub mod error;
pub mod gemini;
pub mod handler;
pub mod media;
pub mod prompt;
pub mod recipe;
pub mod report;
pub mod server;

#[cfg(test)]
mod test_support;

pub use analyzer::{analyze_video, AnalysisResult, Transport, VideoAsset, INLINE_LIMIT_BYTES};
pub use batch::{discover_videos, process_directory, run_batch, BatchSummary};
pub use config::{AppConfig, ConfigLoader};
pub use error::{GeminiError, GeminiResult};
pub use gemini::{ContentGenerator, GeminiClient, GeminiConfig, UploadedFile};
pub use handler::{AnalyzeResponse, AppState};
pub use recipe::{structure_response, ExtractionStrategy, RecipeRecord};
pub use report::{ReportRow, RowStatus};
pub use server::build_router;
