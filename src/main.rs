use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use video_recipe::{
    build_router, prompt, run_batch, AppConfig, AppState, ConfigLoader, GeminiClient,
};

/// 菜谱视频分析工具 - 把烹饪视频交给 Gemini，提取结构化菜谱
#[derive(Parser, Debug)]
#[command(name = "video-recipe")]
#[command(about = "菜谱视频分析：HTTP 接口与批量目录处理", long_about = None)]
struct Args {
    /// 配置文件路径（可选，支持 .ini 格式）
    /// 优先级：命令行参数 > 环境变量 > 配置文件 > 默认值
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Web 服务模式：启动 HTTP 服务器，提供 POST /analyze
    Serve {
        /// 监听地址（默认读取 VIDEO_RECIPE_BIND 或 PORT，否则 0.0.0.0:8000）
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// 批量模式：处理目录中的所有视频
    Batch {
        /// 视频目录；第一个必须存在，其余不存在时跳过
        #[arg(required = true)]
        dirs: Vec<PathBuf>,

        /// 提示词文件（覆盖配置中的 batch_prompt_file）
        #[arg(long)]
        prompt_file: Option<PathBuf>,
    },
    /// 生成默认配置文件
    InitConfig {
        /// 输出路径
        #[arg(default_value = "video-recipe.ini")]
        path: PathBuf,
    },
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env 不存在时忽略
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = ConfigLoader::load(args.config.as_deref()).context("加载配置失败")?;
    init_tracing(&config);

    match args.command {
        Commands::Serve { bind } => {
            let bind_addr = bind.unwrap_or_else(|| config.bind.clone());
            start_web_server(&config, &bind_addr).await?;
        }
        Commands::Batch { dirs, prompt_file } => {
            let prompt_path = prompt_file.or_else(|| config.batch_prompt_file.clone());
            let prompt = prompt::load_prompt(prompt_path.as_deref(), prompt::BATCH_PROMPT)?;
            let client = GeminiClient::new(config.gemini_config()?)
                .context("创建 Gemini 客户端失败")?;

            match run_batch(&client, &dirs, &prompt).await {
                Ok(summaries) => {
                    let total: usize = summaries.iter().map(|s| s.rows.len()).sum();
                    let failed: usize = summaries.iter().map(|s| s.failed()).sum();
                    tracing::info!("批量处理结束: 共 {} 个视频，失败 {} 个", total, failed);
                    println!("\n{}", "=".repeat(60));
                    println!("ALL PROCESSING COMPLETE!");
                    println!("{}", "=".repeat(60));
                }
                Err(e) => {
                    println!("Error: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::InitConfig { path } => {
            ConfigLoader::create_default_config(&path)?;
            println!("已生成配置文件: {}", path.display());
        }
    }

    Ok(())
}

async fn start_web_server(config: &AppConfig, bind: &str) -> Result<()> {
    let prompt = prompt::load_prompt(config.server_prompt_file.as_deref(), prompt::SERVER_PROMPT)?;
    let client =
        GeminiClient::new(config.gemini_config()?).context("创建 Gemini 客户端失败")?;
    tracing::info!("Gemini 模型: {}", client.model());

    let state = AppState::new(Arc::new(client), prompt);
    let app = build_router(state, config.cors_origins.clone(), config.max_upload_bytes());

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .context(format!("绑定地址失败: {}", bind))?;

    tracing::info!("Web 服务器启动在: http://{}", bind);
    tracing::info!("  • 健康检查: GET  http://{}/health", bind);
    tracing::info!("  • 视频分析: POST http://{}/analyze", bind);
    tracing::info!("  • 允许的跨域来源: {:?}", config.cors_origins);

    axum::serve(listener, app)
        .await
        .context("启动服务器失败")?;

    Ok(())
}
