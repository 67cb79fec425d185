use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stream_lens::config::Config;
use stream_lens::web;

#[derive(Parser)]
#[command(name = "stream-lens", version, about = "Streaming manifest analysis service")]
struct Cli {
    /// Path to the configuration file (created with defaults if absent)
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Override the configured bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the configured bind port
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level when RUST_LOG is not set
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("stream_lens={},tower_http=warn", cli.log_level))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::load_from_file(&cli.config)?;
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    web::run(&config).await
}
