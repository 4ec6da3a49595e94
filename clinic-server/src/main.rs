//! 门诊排队服务器主程序

mod settings;

use anyhow::Result;
use clap::Parser;
use clinic_store::MemoryStore;
use clinic_web::{AppState, QueueMetrics, WebServer};
use clinic_workflow::{QueueCache, QueueEngine};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::settings::{ClinicConfig, ConfigValidator};

/// 排队服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "clinic-server")]
#[command(about = "门诊分诊排队服务器")]
struct Args {
    /// 监听地址
    #[arg(long)]
    host: Option<String>,

    /// 服务器端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ClinicConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    // 初始化日志，RUST_LOG 优先
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting clinic queue server...");
    ConfigValidator::new().validate(&config)?;

    let catalog = config.catalog()?;
    info!("Room catalog:");
    for room in catalog.rooms() {
        info!("  {} ({}) serves {:?}", room.id, room.station, room.compatible_with);
    }

    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(QueueEngine::new(store.clone(), catalog, config.workflow.clone()));
    let cache = Arc::new(QueueCache::start(store, &config.workflow.tokens_path).await?);

    let state = AppState::new(engine, QueueMetrics::new()?).with_cache(cache.clone());
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let server = WebServer::new(addr, state);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = &result {
                error!("Server stopped: {}", e);
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    if let Ok(cache) = Arc::try_unwrap(cache) {
        cache.shutdown().await;
    }

    info!("Clinic queue server stopped");
    Ok(())
}
