//! 单元测试用的假分析服务

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::GeminiResult;
use crate::gemini::{ContentGenerator, UploadedFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Inline {
        len: usize,
        mime_type: String,
    },
    Upload {
        path: PathBuf,
        len: usize,
        existed: bool,
    },
    FromFile {
        name: String,
    },
}

type Responder = dyn Fn(usize) -> GeminiResult<String> + Send + Sync;

/// 按视频字节数决定回复内容，并记录每一次调用
pub struct FakeGenerator {
    respond: Box<Responder>,
    calls: Mutex<Vec<Call>>,
}

impl FakeGenerator {
    pub fn new(respond: impl Fn(usize) -> GeminiResult<String> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate_inline(
        &self,
        video: &[u8],
        mime_type: &str,
        _prompt: &str,
    ) -> GeminiResult<String> {
        self.record(Call::Inline {
            len: video.len(),
            mime_type: mime_type.to_string(),
        });
        (self.respond)(video.len())
    }

    async fn upload_file(&self, path: &Path, mime_type: &str) -> GeminiResult<UploadedFile> {
        let len = std::fs::metadata(path).map(|m| m.len() as usize).unwrap_or(0);
        self.record(Call::Upload {
            path: path.to_path_buf(),
            len,
            existed: path.exists(),
        });
        Ok(UploadedFile {
            name: format!("files/fake-{}", len),
            uri: format!("fake://{}", len),
            mime_type: mime_type.to_string(),
            state: Some("ACTIVE".to_string()),
        })
    }

    async fn generate_from_file(&self, file: &UploadedFile, _prompt: &str) -> GeminiResult<String> {
        self.record(Call::FromFile {
            name: file.name.clone(),
        });
        let len = file
            .uri
            .trim_start_matches("fake://")
            .parse()
            .unwrap_or(0);
        (self.respond)(len)
    }
}
