use clap::Parser;
use resource_dashboard::api::{router, AppState, SharedHost};
use resource_dashboard::config::{Layout, Mode, MonitorArgs, DASHBOARD_HISTORY};
use resource_dashboard::console;
use resource_dashboard::monitor::{Monitor, MonitorConfig};
use resource_dashboard::runtime;
use resource_dashboard::sampler::Sampler;
use resource_dashboard::source::{SysinfoSource, SystemSource};
use resource_dashboard::storage::SharedHistory;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "resource_dashboard",
    about = "System monitoring dashboard (web/console)"
)]
struct Args {
    #[command(flatten)]
    monitor: MonitorArgs,

    /// Output mode (console/web/both)
    #[arg(long, value_enum, default_value_t = Mode::Web)]
    mode: Mode,

    /// Chart layout for the web page (combined/separate)
    #[arg(long, value_enum, default_value_t = Layout::Separate)]
    layout: Layout,

    /// Bind address for HTTP server
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// HTTP server port
    #[arg(long, default_value_t = 8050)]
    port: u16,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    runtime::init_tracing();
    let args = Args::parse();
    let history_depth = args.monitor.history_or(DASHBOARD_HISTORY);
    info!(
        "Starting dashboard: mode={:?}, layout={:?}, interval={}s, history={}, bind={}, port={}",
        args.mode, args.layout, args.monitor.interval_secs, history_depth, args.bind, args.port
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

    let (stream_tx, _stream_rx) = tokio::sync::broadcast::channel(256);

    // Keep history+stream subscriber alive.
    let _history_activity = resource_dashboard::bus::register_history_subscriber(
        history.clone(),
        stream_tx.clone(),
    );

    let monitor = Monitor::new(MonitorConfig::new(args.monitor.interval()), sampler);
    let monitor_cancel = cancel.clone();
    let monitor_handle = tokio::spawn(async move { monitor.run(monitor_cancel).await });

    let console_handle = if args.mode.console_enabled() {
        let console_cancel = cancel.clone();
        let console_history = history.clone();
        let updates = stream_tx.subscribe();
        Some(tokio::spawn(async move {
            console::run_console(console_history, updates, None, console_cancel).await;
        }))
    } else {
        None
    };

    let web_handle = if args.mode.web_enabled() {
        let host_source: Box<dyn SystemSource + Send> = Box::new(SysinfoSource::new());
        let host: SharedHost = Arc::new(Mutex::new(host_source));
        let state = AppState {
            history: history.clone(),
            stream_tx: stream_tx.clone(),
            shutdown: cancel.clone(),
            layout: args.layout,
            host,
        };
        let app = router(state);
        let addr = SocketAddr::from((args.bind, args.port));
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind {}: {}", addr, e);
                cancel.cancel();
                let _ = monitor_handle.await;
                std::process::exit(1);
            }
        };
        info!(
            "HTTP server listening on http://{}",
            listener.local_addr().unwrap_or(addr)
        );
        let shutdown = cancel.clone();
        Some(tokio::spawn(async move {
            let res = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = res {
                error!("Server error: {}", e);
            }
        }))
    } else {
        None
    };

    runtime::shutdown_signal().await;
    cancel.cancel();

    if let Some(h) = web_handle {
        let _ = h.await;
    }
    if let Some(h) = console_handle {
        let _ = h.await;
    }
    let _ = monitor_handle.await;
}
