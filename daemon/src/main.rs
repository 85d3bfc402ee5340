//! drip daemon — entry point for running the faucet settlement service.

use clap::Parser;
use drip_chain::{HttpChainClient, WalletKey};
use drip_faucet::{
    ClaimPipeline, FaucetConfig, FaucetStats, RefillController, ShutdownController, StatusBoard,
    WalletManager,
};
use drip_rpc::{ApiServer, ApiState, QueueStatusCache};
use drip_websocket::{spawn_keepalive_task, NotificationHub, WsServerState};
use std::path::PathBuf;
use std::sync::Arc;

/// How often the refill controller is invoked. Its own cooldowns decide
/// whether an invocation acts.
const REFILL_TIMER_SECS: u64 = 60;

#[derive(Parser)]
#[command(name = "drip-daemon", about = "CosmWasm faucet claim-settlement daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings are
    /// used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Chain gateway endpoint.
    #[arg(long, env = "DRIP_RPC_HOST")]
    rpc_host: Option<String>,

    /// Hot wallet mnemonic (prefer the env var over the flag).
    #[arg(long, env = "DRIP_WALLET_MNEMONIC")]
    wallet_mnemonic: Option<String>,

    /// HTTP API + WebSocket port.
    #[arg(long, env = "DRIP_API_PORT")]
    api_port: Option<u16>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "DRIP_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the faucet daemon.
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    drip_utils::init_tracing(&cli.log_level);

    let mut config = if let Some(ref config_path) = cli.config {
        let path = config_path.display().to_string();
        let cfg = FaucetConfig::from_toml_file(&path)?;
        tracing::info!("loaded config from {path}");
        cfg
    } else {
        FaucetConfig::default()
    };
    if let Some(rpc_host) = cli.rpc_host {
        config.rpc_host = rpc_host;
    }
    if let Some(mnemonic) = cli.wallet_mnemonic {
        config.wallet_mnemonic = mnemonic;
    }
    if let Some(api_port) = cli.api_port {
        config.api_port = api_port;
    }
    config.log_level = cli.log_level;
    config.validate()?;

    match cli.command {
        Command::Run => run(Arc::new(config)).await,
    }
}

async fn run(config: Arc<FaucetConfig>) -> anyhow::Result<()> {
    let key = WalletKey::from_mnemonic(&config.wallet_mnemonic, &config.address_prefix);
    tracing::info!(address = key.address(), "faucet wallet derived");

    let signer = Arc::new(HttpChainClient::new_signing(config.rpc_host.clone(), key)?);
    let query = Arc::new(HttpChainClient::new_readonly(config.rpc_host.clone())?);

    // Sessions live in memory unless a durable SessionStore backend is
    // wired in; the settlement pipeline only sees the trait.
    let store = Arc::new(drip_nullables::NullSessionStore::new());
    let status = Arc::new(StatusBoard::new());
    let stats = Arc::new(FaucetStats::new());
    let hub = Arc::new(NotificationHub::new(config.ws_ping_timeout_secs));

    let wallet = Arc::new(WalletManager::new(
        config.clone(),
        signer,
        query.clone(),
        status.clone(),
    ));
    wallet.initialize().await;

    let pipeline = Arc::new(ClaimPipeline::new(
        config.clone(),
        store.clone(),
        wallet.clone(),
        query.clone(),
        hub.clone(),
        Vec::new(),
        stats,
    ));
    let restored = pipeline.restore()?;
    if restored > 0 {
        tracing::info!(restored, "claims reinstated from storage");
    }

    let refill = Arc::new(RefillController::new(
        config.clone(),
        wallet.clone(),
        store.clone(),
        pipeline.clone(),
        query,
    ));

    let shutdown = ShutdownController::new();
    shutdown.register(
        "wallet-reload",
        wallet.spawn_reload_listener(shutdown.subscribe()),
    );
    shutdown.register(
        "wallet-refresh",
        wallet.spawn_refresh_task(shutdown.subscribe()),
    );
    shutdown.register("claim-tick", pipeline.spawn_tick_task(shutdown.subscribe()));
    shutdown.register(
        "refill-timer",
        refill.spawn_timer(REFILL_TIMER_SECS, shutdown.subscribe()),
    );
    shutdown.register(
        "ws-keepalive",
        spawn_keepalive_task(
            hub.clone(),
            config.ws_ping_interval_secs,
            shutdown.subscribe(),
        ),
    );

    let api = Arc::new(ApiState {
        pipeline: pipeline.clone(),
        wallet,
        store: store.clone(),
        status,
        queue_cache: QueueStatusCache::new(config.queue_status_cache_secs),
    });
    let ws = Arc::new(WsServerState { hub, store });
    let server = ApiServer::new(config.api_port, api, ws);

    let server_shutdown = shutdown.subscribe();
    let server_task = tokio::spawn(async move { server.start(server_shutdown).await });

    shutdown.wait_for_signal().await;

    pipeline.dispose();
    shutdown.drain().await;
    server_task.await??;

    tracing::info!("drip daemon exited cleanly");
    Ok(())
}
