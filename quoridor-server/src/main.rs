use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use protocol::NetworkConfig;
use quoridor_server::{Server, ServerState};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("quoridor_server=debug".parse()?))
        .init();

    info!("步步为营服务端启动中...");

    let addr = std::env::var("QUORIDOR_ADDR").unwrap_or_else(|_| NetworkConfig::default().addr());
    let state = ServerState::new()?;
    info!("对局记录目录: {:?}", state.storage.records_directory());

    let server = Server::bind(&addr, state).await?;
    server.run().await
}
