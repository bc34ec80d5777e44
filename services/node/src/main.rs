use anyhow::Context;
use simlink_core::banner::{failure_banner, startup_banner, version_text};
use simlink_core::{logging, DeploymentMode, NodeConfig};
use simlink_server::{ServerNode, UnsupportedBackend};
use std::sync::Arc;
use tracing::{info, warn};

mod args;

use args::NodeArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    if args::wants_version(&raw) {
        println!("{}", version_text(DeploymentMode::from_env().unwrap_or_default()));
        return Ok(());
    }

    let args = NodeArgs::parse(raw)?;
    let mode = DeploymentMode::from_env()?;

    let mut config = match &args.config_file {
        Some(path) => NodeConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => NodeConfig::for_mode(mode),
    };
    config.mode = mode;
    if args.port.is_some() {
        config.rpc_port = args.port;
    }
    if args.log_level.is_some() {
        config.log_level = args.log_level.clone();
    }
    config.debug |= args.debug;

    logging::init_with_level(config.log_level.as_deref());
    for arg in &args.ignored {
        warn!(arg = %arg, "Ignoring unrecognized argument");
    }

    println!("{}", startup_banner(mode));
    info!(
        %mode,
        rpc_port = config.effective_rpc_port(),
        session_port = config.session_port,
        debug = config.debug,
        "Starting node"
    );

    let node = match ServerNode::start(&config, Arc::new(UnsupportedBackend)).await {
        Ok(node) => node,
        Err(e) => {
            eprintln!("{}", failure_banner(mode, e.stage(), &e.to_string()));
            return Err(e.into());
        }
    };
    info!(rpc = %node.registry().local_addr(), "Node ready");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        _ = node.wait_for_shutdown() => info!("Shutdown requested by client"),
    }

    node.shutdown();
    info!("Node stopped");
    Ok(())
}
