use anyhow::Result;
use clap::Parser;
use gatehouse_server::config::GatehouseConfig;
use gatehouse_server::server::GatehouseServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gatehouse-server", about = "Gatehouse account service")]
struct Args {
    /// Configuration file (json/toml/yaml stem or full path)
    #[arg(short, long, default_value = "config", env = "GATEHOUSE_CONFIG")]
    config: String,

    /// Override the configured bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the configured bind port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = GatehouseConfig::load(&args.config)?;
    if let Some(host) = args.host {
        config.http.host = host;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let server = GatehouseServer::from_config(config).await?;
    let router = server.router();

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "gatehouse server listening");
    axum::serve(listener, router).await?;
    Ok(())
}
