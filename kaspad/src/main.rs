mod args;
mod daemon;

use args::Args;
use clap::Parser;
use kaspad_core::{panic::configure_panic, signals::Signals};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let args = Args::parse();

    // The log directory must exist before the rolling appender opens its file
    let app_dir = args.app_dir();
    let _ = std::fs::create_dir_all(&app_dir);
    kaspad_core::log::init_logger(app_dir.to_str(), log::LevelFilter::Info);
    configure_panic();

    let daemon = match daemon::create_daemon(args) {
        Ok(daemon) => daemon,
        Err(err) => {
            log::error!("Initialization failed: {err}");
            return ExitCode::from(1);
        }
    };

    Arc::new(Signals::new(daemon.core.clone())).init();

    // The RPC transport (gRPC/websocket plumbing) is an external collaborator;
    // the façade stays alive here for it to consume
    let _rpc_service = daemon.rpc_service.clone();

    log::info!("Kaspad is starting");
    daemon.core.run();
    log::info!("Kaspad has stopped");
    ExitCode::SUCCESS
}
