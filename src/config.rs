use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::gemini::{GeminiConfig, DEFAULT_API_BASE_URL, DEFAULT_MODEL};

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_UPLOAD_MB: usize = 512;

/// 默认允许的跨域来源
pub const DEFAULT_CORS_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "https://your-vercel-app.vercel.app",
    "https://*.vercel.app",
];

/// 运行配置
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Gemini API Key，仅从环境变量读取
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub file_poll_interval_ms: u64,
    pub file_ready_timeout_secs: u64,
    /// HTTP 接口提示词文件（未设置时使用内置提示词）
    pub server_prompt_file: Option<PathBuf>,
    /// 批量模式提示词文件
    pub batch_prompt_file: Option<PathBuf>,
    pub bind: String,
    pub cors_origins: Vec<String>,
    pub max_upload_mb: usize,
    /// 日志级别（trace, debug, info, warn, error）
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 600,
            file_poll_interval_ms: 2000,
            file_ready_timeout_secs: 300,
            server_prompt_file: None,
            batch_prompt_file: None,
            bind: DEFAULT_BIND.to_string(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// 构建 Gemini 客户端配置；缺少 API Key 时报错
    pub fn gemini_config(&self) -> Result<GeminiConfig> {
        let api_key = self
            .api_key
            .clone()
            .context("未找到 GEMINI_API_KEY（或 GOOGLE_API_KEY）环境变量")?;

        Ok(GeminiConfig {
            api_key,
            model: self.model.clone(),
            base_url: self.api_base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            file_poll_interval: Duration::from_millis(self.file_poll_interval_ms),
            file_ready_timeout: Duration::from_secs(self.file_ready_timeout_secs),
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// 配置文件中读到的值，全部可选
#[derive(Debug, Default, Clone)]
struct FileConfig {
    model: Option<String>,
    api_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    file_poll_interval_ms: Option<u64>,
    file_ready_timeout_secs: Option<u64>,
    server_prompt_file: Option<PathBuf>,
    batch_prompt_file: Option<PathBuf>,
    bind: Option<String>,
    cors_origins: Option<Vec<String>>,
    max_upload_mb: Option<usize>,
    log_level: Option<String>,
}

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 加载配置，优先级：命令行参数 > 环境变量 > 配置文件 > 默认值
    pub fn load(config_file: Option<&Path>) -> Result<AppConfig> {
        let file_config = match config_file {
            // 显式指定的配置文件必须能读取
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_from_default_locations().unwrap_or_default(),
        };
        Ok(Self::merge(file_config, |key| env::var(key).ok()))
    }

    fn merge(file: FileConfig, env_var: impl Fn(&str) -> Option<String>) -> AppConfig {
        let defaults = AppConfig::default();
        let bind = env_var("VIDEO_RECIPE_BIND")
            .or_else(|| env_var("PORT").map(|port| format!("0.0.0.0:{}", port.trim())))
            .or(file.bind)
            .unwrap_or(defaults.bind);

        AppConfig {
            api_key: env_var("GEMINI_API_KEY")
                .or_else(|| env_var("GOOGLE_API_KEY"))
                .filter(|k| !k.trim().is_empty()),
            model: env_var("VIDEO_RECIPE_MODEL")
                .or(file.model)
                .unwrap_or(defaults.model),
            api_base_url: env_var("VIDEO_RECIPE_API_BASE_URL")
                .or(file.api_base_url)
                .unwrap_or(defaults.api_base_url),
            request_timeout_secs: parse_value(env_var("VIDEO_RECIPE_REQUEST_TIMEOUT_SECS"))
                .or(file.request_timeout_secs)
                .unwrap_or(defaults.request_timeout_secs),
            file_poll_interval_ms: file
                .file_poll_interval_ms
                .unwrap_or(defaults.file_poll_interval_ms),
            file_ready_timeout_secs: file
                .file_ready_timeout_secs
                .unwrap_or(defaults.file_ready_timeout_secs),
            server_prompt_file: env_var("VIDEO_RECIPE_SERVER_PROMPT_FILE")
                .map(PathBuf::from)
                .or(file.server_prompt_file),
            batch_prompt_file: env_var("VIDEO_RECIPE_BATCH_PROMPT_FILE")
                .map(PathBuf::from)
                .or(file.batch_prompt_file),
            bind,
            cors_origins: env_var("VIDEO_RECIPE_CORS_ORIGINS")
                .map(|v| split_list(&v))
                .or(file.cors_origins)
                .unwrap_or(defaults.cors_origins),
            max_upload_mb: parse_value(env_var("VIDEO_RECIPE_MAX_UPLOAD_MB"))
                .or(file.max_upload_mb)
                .unwrap_or(defaults.max_upload_mb),
            log_level: env_var("LOG_LEVEL")
                .or(file.log_level)
                .unwrap_or(defaults.log_level),
        }
    }

    /// 从INI配置文件加载配置
    fn load_from_file(config_path: &Path) -> Result<FileConfig> {
        if !config_path.exists() {
            return Err(anyhow::anyhow!("配置文件不存在: {}", config_path.display()));
        }

        let mut ini = configparser::ini::Ini::new();
        ini.load(config_path)
            .map_err(|e| anyhow::anyhow!("读取配置文件失败: {}: {}", config_path.display(), e))?;

        let get = |section: &str, key: &str| {
            ini.get(section, key)
                .or_else(|| ini.get("default", key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(FileConfig {
            model: get("gemini", "model"),
            api_base_url: get("gemini", "api_base_url"),
            request_timeout_secs: parse_value(get("gemini", "request_timeout_secs")),
            file_poll_interval_ms: parse_value(get("gemini", "file_poll_interval_ms")),
            file_ready_timeout_secs: parse_value(get("gemini", "file_ready_timeout_secs")),
            server_prompt_file: get("prompts", "server_prompt_file").map(PathBuf::from),
            batch_prompt_file: get("prompts", "batch_prompt_file").map(PathBuf::from),
            bind: get("server", "bind"),
            cors_origins: get("server", "cors_origins").map(|v| split_list(&v)),
            max_upload_mb: parse_value(get("server", "max_upload_mb")),
            log_level: get("logging", "level"),
        })
    }

    /// 从默认位置加载配置文件
    fn load_from_default_locations() -> Result<FileConfig> {
        let mut candidates = vec![
            PathBuf::from("video-recipe.ini"),
            PathBuf::from(".video-recipe.ini"),
        ];
        if let Some(home) = env::var_os("HOME") {
            candidates.push(PathBuf::from(home).join(".video-recipe.ini"));
        }
        candidates.push(PathBuf::from("/etc/video-recipe.ini"));

        for path in candidates {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Err(anyhow::anyhow!("未找到配置文件"))
    }

    /// 创建默认配置文件
    pub fn create_default_config(config_path: &Path) -> Result<()> {
        let defaults = AppConfig::default();
        let mut ini = configparser::ini::Ini::new();
        ini.set("gemini", "model", Some(defaults.model));
        ini.set("gemini", "api_base_url", Some(defaults.api_base_url));
        ini.set(
            "gemini",
            "request_timeout_secs",
            Some(defaults.request_timeout_secs.to_string()),
        );
        ini.set(
            "gemini",
            "file_poll_interval_ms",
            Some(defaults.file_poll_interval_ms.to_string()),
        );
        ini.set(
            "gemini",
            "file_ready_timeout_secs",
            Some(defaults.file_ready_timeout_secs.to_string()),
        );
        ini.set("prompts", "server_prompt_file", Some(String::new()));
        ini.set("prompts", "batch_prompt_file", Some(String::new()));
        ini.set("server", "bind", Some(defaults.bind));
        ini.set("server", "cors_origins", Some(defaults.cors_origins.join(",")));
        ini.set("server", "max_upload_mb", Some(defaults.max_upload_mb.to_string()));
        ini.set("logging", "level", Some(defaults.log_level));

        ini.write(config_path)
            .map_err(|e| anyhow::anyhow!("写入配置文件失败: {}: {}", config_path.display(), e))?;

        Ok(())
    }
}

/// 无法解析的数值按未设置处理
fn parse_value<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
