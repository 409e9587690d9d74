use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder;
use tokio::sync::{Mutex, broadcast};

use name_lsr::config::RouterConfig;
use name_lsr::control_server::ControlServer;
use name_lsr::update::ConfigFileHook;
use name_lsr::{CommandProcessor, LsaInstaller, Lsdb, LsdbEvent};

#[derive(Parser)]
#[command(name = "name-lsrd", about = "Name advertisement daemon")]
struct Cli {
    /// JSON router configuration; saved prefixes are written back to it
    #[arg(long, required = true)]
    config: PathBuf,

    /// Log filter, e.g. "debug" or "name_lsr=trace" (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let env = env_logger::Env::default().default_filter_or("info");
    let mut logger = env_logger::Builder::from_env(env);
    if let Some(filter) = &cli.log_level {
        logger.parse_filters(filter);
    }
    logger.init();

    let config = RouterConfig::load(&cli.config)?;
    let router = config.router_prefix();
    info!(
        "Starting {} with {} configured prefixes",
        router,
        config.advertising.len()
    );

    let rt = Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let mut lsdb = Lsdb::new(router, config.lsa_lifetime());
        let events = lsdb.subscribe();
        tokio::spawn(log_events(events));

        let npl = config.prefix_list();
        lsdb.build_and_install_own_name_lsa(&npl);

        let processor = CommandProcessor::with_hook(npl, lsdb, ConfigFileHook::new(&cli.config));
        let server = ControlServer::new(
            SocketAddr::from(([127, 0, 0, 1], config.control_port)),
            Arc::new(Mutex::new(processor)),
        );
        server.start().await
    })
}

// Route computation and flooding live outside this daemon; until they are
// attached, database changes are only reported.
async fn log_events(mut events: broadcast::Receiver<LsdbEvent>) {
    loop {
        match events.recv().await {
            Ok(LsdbEvent::OwnLsaBuilt { seq_no, wire }) => {
                info!("Own name LSA seq {} ready for distribution ({} bytes)", seq_no, wire.len());
            }
            Ok(LsdbEvent::NamesAdded { origin, names }) => {
                info!("{} now advertises {} prefixes", origin, names.len());
            }
            Ok(LsdbEvent::NamesUpdated { origin, added, removed }) => {
                info!("{}: {} prefixes added, {} removed", origin, added.len(), removed.len());
            }
            Ok(LsdbEvent::AdjacenciesChanged { origin }) => {
                info!("Adjacencies of {} changed", origin);
            }
            Ok(LsdbEvent::CoordinatesChanged { origin }) => {
                info!("Coordinates of {} changed", origin);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event logger lagged, {} events skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
