use chrono::{TimeZone, Utc};
use resource_dashboard::api::{router, AppState, SharedHost};
use resource_dashboard::config::Layout;
use resource_dashboard::error::SamplingError;
use resource_dashboard::metrics::{PartitionUsage, Snapshot};
use resource_dashboard::source::{
    DiskReading, FakeSource, MemoryReading, PerformanceInfo, SwapReading, SystemSource,
};
use resource_dashboard::storage::SharedHistory;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;

fn app_with(history: Arc<SharedHistory>, layout: Layout) -> axum::Router {
    let source: Box<dyn SystemSource + Send> =
        Box::new(FakeSource::new().with_memory(1000, 250).with_cached(100));
    app_with_host(history, layout, source)
}

fn app_with_host(
    history: Arc<SharedHistory>,
    layout: Layout,
    source: Box<dyn SystemSource + Send>,
) -> axum::Router {
    let (stream_tx, _stream_rx) = tokio::sync::broadcast::channel(8);
    let host: SharedHost = Arc::new(Mutex::new(source));
    router(AppState {
        history,
        stream_tx,
        shutdown: CancellationToken::new(),
        layout,
        host,
    })
}

async fn get(app: axum::Router, uri: &str) -> (u16, Vec<u8>) {
    let response = app
        .oneshot(
            axum::http::Request::builder()
                .uri(uri)
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status().as_u16();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn history_initially_empty() {
    let app = app_with(Arc::new(SharedHistory::new(20)), Layout::Separate);
    let (status, body) = get(app, "/api/history").await;
    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["capacity"].as_u64().unwrap(), 20);
    assert_eq!(json["ram"].as_array().unwrap().len(), 0);
    assert_eq!(json["timestamps"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn health_ok() {
    let app = app_with(Arc::new(SharedHistory::new(20)), Layout::Separate);
    let (status, _) = get(app, "/api/health").await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn latest_is_404_until_first_sample() {
    let history = Arc::new(SharedHistory::new(20));
    let (status, _) = get(app_with(history.clone(), Layout::Separate), "/api/metrics").await;
    assert_eq!(status, 404);

    history.append(sample_snapshot(1, 33.0));
    let (status, body) = get(app_with(history, Layout::Separate), "/api/metrics").await;
    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["ram_percent"].as_f64().unwrap(), 33.0);
}

#[tokio::test]
async fn history_is_columnar_and_evicts_oldest() {
    let history = Arc::new(SharedHistory::new(3));
    for (i, ram) in [40.0, 55.0, 70.0, 20.0].into_iter().enumerate() {
        history.append(sample_snapshot(i as i64, ram));
    }
    let (status, body) = get(app_with(history, Layout::Separate), "/api/history").await;
    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let ram: Vec<f64> = json["ram"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    assert_eq!(ram, vec![55.0, 70.0, 20.0]);
    for column in ["timestamps", "cpu", "disk", "swap", "cache"] {
        assert_eq!(json[column].as_array().unwrap().len(), 3, "{column}");
    }
}

#[tokio::test]
async fn history_limit_keeps_newest() {
    let history = Arc::new(SharedHistory::new(10));
    for i in 0..5 {
        history.append(sample_snapshot(i, i as f64));
    }
    let (_, body) = get(app_with(history, Layout::Separate), "/api/history?limit=2").await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let ram = json["ram"].as_array().unwrap();
    assert_eq!(ram.len(), 2);
    assert_eq!(ram[0].as_f64().unwrap(), 3.0);
}

#[tokio::test]
async fn host_breakdown() {
    let app = app_with(Arc::new(SharedHistory::new(20)), Layout::Separate);
    let (status, body) = get(app, "/api/host").await;
    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["ram"]["used_pct"].as_f64().unwrap(), 25.0);
    assert_eq!(json["cache"]["cached_bytes"].as_u64().unwrap(), 100);
    assert!(json["cache"]["buffers_bytes"].is_null());
}

/// Host whose partition listing hangs like a stalled network mount.
struct SlowMountHost {
    inner: FakeSource,
    delay: Duration,
}

impl SystemSource for SlowMountHost {
    fn memory(&mut self) -> Result<MemoryReading, SamplingError> {
        self.inner.memory()
    }

    fn swap(&mut self) -> Result<SwapReading, SamplingError> {
        self.inner.swap()
    }

    fn root_disk(&mut self) -> Result<DiskReading, SamplingError> {
        self.inner.root_disk()
    }

    fn partitions(&mut self) -> Result<Vec<PartitionUsage>, SamplingError> {
        std::thread::sleep(self.delay);
        self.inner.partitions()
    }

    fn cpu_usage(&mut self) -> Result<f64, SamplingError> {
        self.inner.cpu_usage()
    }

    fn performance_info(&mut self) -> Result<PerformanceInfo, SamplingError> {
        self.inner.performance_info()
    }
}

#[tokio::test]
async fn slow_host_breakdown_does_not_stall_runtime() {
    let source = SlowMountHost {
        inner: FakeSource::new().with_memory(1000, 500),
        delay: Duration::from_millis(600),
    };
    let app = app_with_host(
        Arc::new(SharedHistory::new(20)),
        Layout::Separate,
        Box::new(source),
    );

    let start = Instant::now();
    let request = tokio::spawn(get(app, "/api/host"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    let woke_after = start.elapsed();

    let (status, _) = request.await.unwrap();
    assert_eq!(status, 200);
    assert!(
        woke_after < Duration::from_millis(400),
        "timer delayed {woke_after:?} by host breakdown"
    );
}

#[tokio::test]
async fn failing_host_breakdown_is_503() {
    let mut source = FakeSource::new().with_memory(1000, 500);
    source.fail_next(resource_dashboard::source::fake::FakeQuery::Memory);
    let app = app_with_host(
        Arc::new(SharedHistory::new(20)),
        Layout::Separate,
        Box::new(source),
    );
    let (status, body) = get(app, "/api/host").await;
    assert_eq!(status, 503);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("injected"));
}

#[tokio::test]
async fn page_streams_before_history_and_refreshes_host_on_timer() {
    let app = app_with(Arc::new(SharedHistory::new(20)), Layout::Separate);
    let (_, body) = get(app, "/").await;
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("startStream().then(loadHistory);"));
    assert!(html.contains("if (t <= lastLoaded) return;"));
    assert!(html.contains("setInterval(loadHost, HOST_REFRESH_MS);"));
}

#[tokio::test]
async fn index_embeds_layout_and_capacity() {
    let app = app_with(Arc::new(SharedHistory::new(20)), Layout::Combined);
    let (status, body) = get(app, "/").await;
    assert_eq!(status, 200);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("const LAYOUT = 'combined';"));
    assert!(html.contains("const CAPACITY = 20;"));
}

#[tokio::test]
async fn stream_is_event_stream() {
    let app = app_with(Arc::new(SharedHistory::new(20)), Layout::Separate);
    let response = app
        .oneshot(
            axum::http::Request::builder()
                .uri("/api/stream")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let ct = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(ct.starts_with("text/event-stream"));
}

fn sample_snapshot(i: i64, ram: f64) -> Snapshot {
    Snapshot {
        timestamp: Utc.timestamp_opt(1_700_000_000 + i, 0).unwrap(),
        ram_percent: ram,
        cpu_percent: 10.0,
        disk_percent: 50.0,
        swap_percent: 0.0,
        cache_percent: 5.0,
    }
}
