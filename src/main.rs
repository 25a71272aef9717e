//! Repo Health - 仓库健康分析客户端
//!
//! `analyze` 向分析服务提交仓库标识并渲染得分与改进建议；
//! `serve` 启动 `/analyze` 前端服务，把请求转发给上游知识库。

use anyhow::{Context, Result};
use axum::Router;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod client;
mod config;
mod controller;
mod error;
mod models;
mod render;
mod services;
mod state;
mod utils;

use api::create_api_routes;
use client::AnalysisClient;
use config::{get_config, get_config_path, set_config, update_config, AppConfig};
use controller::{AnalysisOutcome, AnalysisRequestController};
use render::{ConsoleNotifier, ConsoleSink, HtmlReportSink, RenderSink};
use state::create_shared_state;
use utils::RequestLogger;

/// 仓库健康分析
#[derive(Parser, Debug)]
#[command(name = "repo-health")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 分析仓库并输出得分与改进建议
    Analyze(AnalyzeArgs),
    /// 启动 /analyze 服务
    Serve(ServeArgs),
    /// 查看或修改配置
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// 仓库标识，例如 octo/repo（原样提交）
    repo: String,

    /// 分析服务地址
    #[arg(long, env = config::ENV_SERVER_URL)]
    server: Option<String>,

    /// 请求超时（秒）
    #[arg(long)]
    timeout: Option<u64>,

    /// 同时写出 HTML 报告
    #[arg(long, value_name = "FILE")]
    html: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// 监听地址
    #[arg(long)]
    bind: Option<String>,

    /// 上游知识库接口地址
    #[arg(long, env = config::ENV_UPSTREAM_URL)]
    upstream_url: Option<String>,

    /// 上游接口密钥
    #[arg(long, env = config::ENV_UPSTREAM_KEY, hide_env_values = true)]
    upstream_key: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// 显示当前配置
    Show,
    /// 修改配置并保存
    Set(ConfigSetArgs),
    /// 恢复默认配置
    Reset,
}

#[derive(Args, Debug)]
struct ConfigSetArgs {
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    timeout: Option<u64>,
    #[arg(long)]
    bind: Option<String>,
    #[arg(long)]
    upstream_url: Option<String>,
    #[arg(long)]
    upstream_key: Option<String>,
    #[arg(long)]
    upstream_timeout: Option<u64>,
}

/// 在 Windows 上设置控制台代码页为 UTF-8
#[cfg(windows)]
fn setup_console_encoding() {
    unsafe {
        // 设置控制台输出代码页为 UTF-8 (65001)
        extern "system" {
            fn SetConsoleOutputCP(code_page: u32) -> i32;
            fn SetConsoleCP(code_page: u32) -> i32;
        }
        SetConsoleOutputCP(65001);
        SetConsoleCP(65001);
    }
}

#[cfg(not(windows))]
fn setup_console_encoding() {}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    setup_console_encoding();

    // 日志写到 stderr，stdout 留给渲染结果
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repo_health=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => run_analyze(args).await,
        Commands::Serve(args) => run_serve(args).await,
        Commands::Config(cmd) => run_config(cmd),
    }
}

async fn run_analyze(args: AnalyzeArgs) -> Result<ExitCode> {
    let mut config = get_config();
    if let Some(server) = args.server {
        config.server_url = server;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }

    let client = AnalysisClient::from_config(&config).context("创建分析客户端失败")?;
    info!("Using analysis endpoint: {}", client.endpoint());

    let console = ConsoleSink::stdout();
    let outcome = match &args.html {
        Some(path) => {
            let report = Arc::new(HtmlReportSink::new(args.repo.as_str()));
            let outcome = analyze_with(client, (console, Arc::clone(&report)), &args.repo).await;
            if matches!(outcome, Some(AnalysisOutcome::Rendered { .. })) {
                report
                    .write_to(path)
                    .with_context(|| format!("写入 HTML 报告失败: {}", path.display()))?;
                info!("HTML report written: {}", path.display());
            }
            outcome
        }
        None => analyze_with(client, console, &args.repo).await,
    };

    Ok(match outcome {
        Some(AnalysisOutcome::Rendered { .. }) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// 传输失败已由控制器提示，这里只区分是否拿到了结果
async fn analyze_with<S: RenderSink>(
    client: AnalysisClient,
    sink: S,
    repo: &str,
) -> Option<AnalysisOutcome> {
    let controller = AnalysisRequestController::new(client, sink, ConsoleNotifier);
    controller.analyze(repo).await.ok()
}

async fn run_serve(args: ServeArgs) -> Result<ExitCode> {
    let mut config = get_config();
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(url) = args.upstream_url {
        config.upstream_url = url;
    }
    if let Some(key) = args.upstream_key {
        config.upstream_api_key = key;
    }

    info!("Starting repo health analysis service...");
    if config.upstream_url.trim().is_empty() {
        warn!("upstream_url not configured, /analyze will answer with demo data");
    }

    let state = create_shared_state(&config, None)?;

    // 页面可能由其他地址提供，允许所有来源
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(create_api_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("无效的监听地址: {}", config.bind_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", addr))?;
    info!("Server listening on: {}", addr);

    axum::serve(listener, app).await.context("服务异常退出")?;
    Ok(ExitCode::SUCCESS)
}

fn run_config(cmd: ConfigCommand) -> Result<ExitCode> {
    let config = match cmd {
        ConfigCommand::Show => get_config(),
        ConfigCommand::Set(args) => update_config(|config| {
            if let Some(server_url) = args.server_url {
                config.server_url = server_url;
            }
            if let Some(timeout) = args.timeout {
                config.timeout_secs = timeout;
            }
            if let Some(bind) = args.bind {
                config.bind_addr = bind;
            }
            if let Some(url) = args.upstream_url {
                config.upstream_url = url;
            }
            if let Some(key) = args.upstream_key {
                config.upstream_api_key = key;
            }
            if let Some(timeout) = args.upstream_timeout {
                config.upstream_timeout_secs = timeout;
            }
        })?,
        ConfigCommand::Reset => {
            set_config(AppConfig::default())?;
            AppConfig::default()
        }
    };

    let display = AppConfig {
        upstream_api_key: RequestLogger::mask_api_key(&config.upstream_api_key),
        ..config
    };
    println!("# {}", get_config_path().display());
    println!("{}", serde_json::to_string_pretty(&display)?);
    Ok(ExitCode::SUCCESS)
}
