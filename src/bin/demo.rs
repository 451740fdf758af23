use clap::Parser;
use resource_dashboard::config::{MonitorArgs, DEMO_HISTORY};
use resource_dashboard::console::{self, HostSource};
use resource_dashboard::monitor::{Monitor, MonitorConfig};
use resource_dashboard::runtime;
use resource_dashboard::sampler::Sampler;
use resource_dashboard::source::SysinfoSource;
use resource_dashboard::storage::SharedHistory;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "resource_dashboard-demo",
    about = "Standalone console memory monitor"
)]
struct Args {
    #[command(flatten)]
    monitor: MonitorArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    runtime::init_tracing();
    let args = Args::parse();
    let history_depth = args.monitor.history_or(DEMO_HISTORY);
    info!(
        "Starting demo: interval={}s, history={}, os={}",
        args.monitor.interval_secs,
        history_depth,
        std::env::consts::OS
    );

    let sampler = match Sampler::new(SysinfoSource::new()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to initialise sampler: {}", e);
            std::process::exit(1);
        }
    };

    let history = Arc::new(SharedHistory::new(history_depth));
    let cancel = CancellationToken::new();
    let (stream_tx, stream_rx) = tokio::sync::broadcast::channel(64);

    let _history_activity =
        resource_dashboard::bus::register_history_subscriber(history.clone(), stream_tx);

    let monitor = Monitor::new(MonitorConfig::new(args.monitor.interval()), sampler);
    let monitor_cancel = cancel.clone();
    let monitor_handle = tokio::spawn(async move { monitor.run(monitor_cancel).await });

    let host: HostSource = Box::new(SysinfoSource::new());
    let console_cancel = cancel.clone();
    let console_handle = tokio::spawn(async move {
        console::run_console(history, stream_rx, Some(host), console_cancel).await;
    });

    runtime::shutdown_signal().await;
    cancel.cancel();

    let _ = console_handle.await;
    let _ = monitor_handle.await;
}
