//! Meridian daemon — entry point for running an overlay node.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use meridian_network::{ShutdownController, TcpConnectionFactory, TcpServer, THREAD_POOL_SIZE};
use meridian_node::{init_logging, LogFormat, Node, NodeConfig, NodeDispatcher};
use meridian_store::MemorySpatialDb;

#[derive(Parser)]
#[command(name = "meridian-daemon", about = "meridian overlay node daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings are
    /// used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// This node's identity.
    #[arg(long, env = "MERIDIAN_NODE_ID")]
    node_id: Option<String>,

    /// Public IP address peers use to reach this node.
    #[arg(long, env = "MERIDIAN_ADDRESS")]
    address: Option<String>,

    /// TCP port to listen on.
    #[arg(long, env = "MERIDIAN_PORT")]
    port: Option<u16>,

    /// Fixed latitude of this node, in degrees.
    #[arg(long, env = "MERIDIAN_LATITUDE")]
    latitude: Option<f64>,

    /// Fixed longitude of this node, in degrees.
    #[arg(long, env = "MERIDIAN_LONGITUDE")]
    longitude: Option<f64>,

    /// Where the spatial database backend keeps its data.
    #[arg(long, env = "MERIDIAN_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Log format: "human" or "json".
    #[arg(long, default_value = "human", env = "MERIDIAN_LOG_FORMAT")]
    log_format: String,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "MERIDIAN_LOG_LEVEL")]
    log_level: String,
}

impl Cli {
    /// Build the effective configuration: file settings as the base, CLI
    /// flags and env vars on top. Every identity field must come from one of
    /// the two; whatever is missing is a configuration error.
    fn into_config(self) -> anyhow::Result<NodeConfig> {
        let file_config = match &self.config {
            Some(path) => Some(NodeConfig::from_toml_file(&path.display().to_string())?),
            None => None,
        };

        let required = |cli: Option<String>, file: Option<String>, name: &str| {
            cli.or(file)
                .ok_or_else(|| anyhow::anyhow!("missing required configuration value: {name}"))
        };

        let (f_id, f_addr, f_port, f_lat, f_lon, f_db, f_seeds) = match file_config {
            Some(f) => (
                Some(f.node_id),
                Some(f.address),
                Some(f.port),
                Some(f.latitude),
                Some(f.longitude),
                Some(f.db_path),
                f.seeds,
            ),
            None => (None, None, None, None, None, None, Vec::new()),
        };

        let config = NodeConfig {
            node_id: required(self.node_id, f_id, "node_id")?,
            address: required(self.address, f_addr, "address")?,
            port: self
                .port
                .or(f_port)
                .ok_or_else(|| anyhow::anyhow!("missing required configuration value: port"))?,
            latitude: self.latitude.or(f_lat).ok_or_else(|| {
                anyhow::anyhow!("missing required configuration value: latitude")
            })?,
            longitude: self.longitude.or(f_lon).ok_or_else(|| {
                anyhow::anyhow!("missing required configuration value: longitude")
            })?,
            db_path: self
                .db_path
                .or(f_db)
                .unwrap_or_else(|| PathBuf::from("./meridian_data")),
            seeds: f_seeds,
            log_format: self.log_format,
            log_level: self.log_level,
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.into_config()?;

    init_logging(LogFormat::from_config(&config.log_format), &config.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(THREAD_POOL_SIZE)
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    let info = config.self_info()?;
    let seeds = config.seed_nodes()?;

    tracing::info!(
        node_id = %info.id(),
        location = %info.location,
        db_path = %config.db_path.display(),
        "starting meridian node"
    );

    let db = Arc::new(MemorySpatialDb::new(info.location));
    let node = Arc::new(Node::new(
        info.clone(),
        db,
        Arc::new(TcpConnectionFactory::new()),
        seeds,
    )?);

    node.bootstrap().await?;
    tracing::info!("network discovery complete, starting to serve");

    let ip = config
        .address
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen address: {e}"))?;
    let listen = SocketAddr::new(ip, config.port);
    let shutdown = Arc::new(ShutdownController::new());
    let server = TcpServer::bind(
        listen,
        Arc::new(NodeDispatcher::new(Arc::clone(&node))),
        Arc::clone(&shutdown),
    )
    .await?;
    tracing::info!(addr = %server.local_addr(), "meridian node is serving");

    shutdown.wait_for_signal().await;
    server.join().await;

    tracing::info!("meridian daemon exited cleanly");
    Ok(())
}
