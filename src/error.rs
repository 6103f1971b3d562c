use thiserror::Error;

pub type GeminiResult<T> = Result<T, GeminiError>;

/// 调用 Gemini 服务过程中可能出现的错误
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Gemini request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Gemini response contained no text")]
    EmptyResponse,

    #[error("Gemini blocked the prompt: {0}")]
    Blocked(String),

    #[error("File upload failed: {0}")]
    Upload(String),

    #[error("Uploaded file {name} entered state {state}")]
    FileProcessing { name: String, state: String },

    #[error("Uploaded file {0} did not become ACTIVE in time")]
    FileTimeout(String),
}

impl GeminiError {
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }
}
