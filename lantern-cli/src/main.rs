use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use lantern_server::{NegotiationConfig, Negotiator, TransportConfig, WebRtcEngine, build_router};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Answers WebRTC offers over HTTP once the answer can traverse NAT.
#[derive(Parser, Debug)]
#[command(name = "lantern", version)]
struct Args {
    /// HTTP port for the /negotiate endpoint
    #[arg(long, default_value_t = 8080, value_parser = clap::value_parser!(u16).range(1..))]
    http_port: u16,

    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// Directory served under /web
    #[arg(long, default_value = "./web/")]
    web_dir: PathBuf,

    /// STUN server URL, repeatable (defaults to two public servers)
    #[arg(long = "stun-server")]
    stun_servers: Vec<String>,

    /// Public IP of a 1:1 NAT to advertise as server reflexive, repeatable
    #[arg(long = "public-ip")]
    public_ips: Vec<String>,

    #[arg(long, default_value_t = 25)]
    poll_interval_ms: u64,

    #[arg(long, default_value_t = 10_000)]
    gather_timeout_ms: u64,

    #[arg(long, default_value_t = 10)]
    heartbeat_interval_ms: u64,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "debug")]
    log_level: String,
}

impl Args {
    fn negotiation_config(&self) -> NegotiationConfig {
        let defaults = TransportConfig::default();
        let ice_servers = if self.stun_servers.is_empty() {
            defaults.ice_servers
        } else {
            self.stun_servers.clone()
        };

        NegotiationConfig {
            transport: TransportConfig {
                ice_servers,
                public_ips: self.public_ips.clone(),
                disable_mdns: defaults.disable_mdns,
            },
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            gather_timeout: Duration::from_millis(self.gather_timeout_ms),
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
        }
    }

    fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.http_port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = args.negotiation_config();
    info!(ice_servers = ?config.transport.ice_servers, "Transport configured");

    let negotiator = Negotiator::new(Arc::new(WebRtcEngine::new()), config);
    let app = build_router(negotiator.clone(), &args.web_dir);

    let addr = args.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Signaling server listening on http://{}", addr);

    axum_serve(listener, app).await?;

    negotiator.shutdown().await;
    info!("Server stopped");
    Ok(())
}

async fn axum_serve(listener: tokio::net::TcpListener, app: Router) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("HTTP server failed")
}
