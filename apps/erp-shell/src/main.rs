//! ERP 客户端外壳：装配共享服务并提供诊断命令。

mod cli;
mod services;

use clap::Parser;
use erp_config::ClientConfig;
use erp_telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在）
    dotenvy::dotenv().ok();
    let config = ClientConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    cli::Cli::parse().run(config).await
}
