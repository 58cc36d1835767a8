// chainmesh-node - Run a ledger node with its peer listener and HTTP surface

use chainmesh::config::parse_peer_list;
use chainmesh::transport::{TcpTransport, DEFAULT_MAX_FRAME_BYTES};
use chainmesh::{api, Node, NodeConfig};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chainmesh-node", version, about = "Hash-linked ledger node")]
struct Cli {
    /// HTTP listen port
    #[arg(long, env = "HTTP_PORT", default_value_t = 3001)]
    http_port: u16,

    /// Peer listen port
    #[arg(long, env = "P2P_PORT", default_value_t = 6001)]
    p2p_port: u16,

    /// Comma-separated peers to dial at startup (host:port)
    #[arg(long, env = "PEERS", default_value = "")]
    peers: String,

    /// Bind address for both listeners
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Outbound connect timeout in seconds
    #[arg(long, default_value_t = 5)]
    connect_timeout_secs: u64,

    /// Per-peer send timeout in milliseconds
    #[arg(long, default_value_t = 1000)]
    send_timeout_ms: u64,

    /// Longest frame accepted from a peer, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_BYTES)]
    max_frame_bytes: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = NodeConfig::new()
        .with_http_bind_address(&cli.bind)
        .with_http_port(cli.http_port)
        .with_p2p_bind_address(&cli.bind)
        .with_p2p_port(cli.p2p_port)
        .with_initial_peers(parse_peer_list(&cli.peers)?)
        .with_connect_timeout_secs(cli.connect_timeout_secs)
        .with_send_timeout_ms(cli.send_timeout_ms)
        .with_max_frame_bytes(cli.max_frame_bytes);

    let node = Node::new(config)?;

    let transport = TcpTransport::bind(node.config().transport()).await?;
    tokio::spawn(node.clone().listen(transport));

    let connected = node.connect_initial_peers().await;
    info!(
        connected,
        configured = node.config().initial_peers.len(),
        "initial peers dialed"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
        info!("shutting down");
    };
    api::serve(node, shutdown).await?;
    Ok(())
}
