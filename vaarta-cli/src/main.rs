use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vaarta_core::IceServerConfig;
use vaarta_server::{DEFAULT_BIND_ADDR, DEFAULT_STUN_SERVER, ServerConfig, serve};

#[derive(Parser, Debug)]
#[command(name = "vaarta-relay")]
#[command(about = "Room membership and call signaling relay")]
struct Args {
    /// Address the WebSocket endpoint listens on.
    #[arg(long, env = "VAARTA_BIND", default_value = DEFAULT_BIND_ADDR)]
    bind: SocketAddr,

    /// STUN/TURN URLs handed to clients in `ice:config`.
    #[arg(
        long,
        env = "VAARTA_ICE_SERVERS",
        value_delimiter = ',',
        default_value = DEFAULT_STUN_SERVER
    )]
    ice_servers: Vec<String>,

    /// Username for the `turn:`/`turns:` entries of `--ice-servers`.
    #[arg(long, env = "VAARTA_ICE_USERNAME", requires = "ice_credential")]
    ice_username: Option<String>,

    #[arg(long, env = "VAARTA_ICE_CREDENTIAL", requires = "ice_username")]
    ice_credential: Option<String>,

    /// Used when RUST_LOG is not set.
    #[arg(long, env = "VAARTA_LOG", default_value = "info")]
    log_level: String,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        let ice_servers = self
            .ice_servers
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(|url| match (&self.ice_username, &self.ice_credential) {
                (Some(username), Some(credential)) if IceServerConfig::is_turn(url) => {
                    IceServerConfig::turn(url, username, credential)
                }
                _ => IceServerConfig::stun(url),
            })
            .collect();

        ServerConfig::default()
            .with_bind_addr(self.bind)
            .with_ice_servers(ice_servers)
    }
}

fn init_tracing(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Invalid log filter")?;

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let config = args.server_config();

    println!("{}", "Starting vaarta signaling relay".green().bold());
    println!("   WebSocket: ws://{}/ws", config.bind_addr);
    println!("   Health:    http://{}/health", config.bind_addr);
    for server in &config.ice_servers {
        println!("   ICE:       {}", server.urls.join(", ").cyan());
    }
    info!("Configured {} ICE servers", config.ice_servers.len());

    serve(config).await
}
