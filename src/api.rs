use crate::config::Layout;
use crate::host::collect_host_details;
use crate::metrics::{ErrorResponse, Snapshot};
use crate::source::SystemSource;
use crate::storage::SharedHistory;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Host handle for on-demand breakdowns, separate from the sampler's own source.
pub type SharedHost = Arc<Mutex<Box<dyn SystemSource + Send>>>;

#[derive(Clone)]
pub struct AppState {
    pub history: Arc<SharedHistory>,
    pub stream_tx: broadcast::Sender<Snapshot>,
    pub shutdown: CancellationToken,
    pub layout: Layout,
    pub host: SharedHost,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/metrics", get(get_latest))
        .route("/api/history", get(get_history))
        .route("/api/host", get(get_host))
        .route("/api/stream", get(stream))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" })).into_response()
}

async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let layout = match state.layout {
        Layout::Combined => "combined",
        Layout::Separate => "separate",
    };
    Html(
        INDEX_HTML
            .replace("__LAYOUT__", layout)
            .replace("__CAPACITY__", &state.history.capacity().to_string()),
    )
}

async fn get_latest(State(state): State<AppState>) -> impl IntoResponse {
    match state.history.latest() {
        Some(snap) => (StatusCode::OK, Json(snap)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no data yet".to_string(),
            }),
        )
            .into_response(),
    }
}

async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let view = state.history.current();
    let view = match query.limit {
        Some(limit) => view.tail(limit),
        None => view,
    };
    (StatusCode::OK, Json(view)).into_response()
}

async fn get_host(State(state): State<AppState>) -> impl IntoResponse {
    // Partition listing can stall on a slow mount; keep it off the runtime thread.
    let host = state.host.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut host = match host.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        collect_host_details(&mut **host)
    })
    .await;
    match result {
        Ok(Ok(details)) => (StatusCode::OK, Json(details)).into_response(),
        Ok(Err(e)) => {
            warn!("Host breakdown failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Host breakdown task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "host breakdown task failed".to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.stream_tx.subscribe();
    let shutdown = state.shutdown.clone();
    let stream = BroadcastStream::new(rx)
        .take_until(async move { shutdown.cancelled().await })
        .map(|msg| match msg {
            Ok(snapshot) => match serde_json::to_string(&snapshot) {
                Ok(json) => Ok(Event::default().data(json)),
                Err(e) => Ok(Event::default()
                    .event("error")
                    .data(format!("serialize_error: {e}"))),
            },
            Err(e) => Ok(Event::default()
                .event("error")
                .data(format!("stream_error: {e}"))),
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(10))
            .text("keep-alive"),
    )
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8"/>
  <title>System Monitoring Dashboard</title>
  <style>
    :root {
      --bg: #0b0f19;
      --panel: #0f1626;
      --border: #2a3550;
      --grid: #1c2740;
      --text: #e5e7eb;
      --muted: #9ca3af;
    }
    body { background: var(--bg); color: var(--text); font-family: ui-sans-serif, system-ui, -apple-system, Segoe UI, Roboto, Arial; margin: 24px; }
    a { color: #93c5fd; text-decoration: none; }
    .links { color: var(--muted); font-size: 12px; margin-bottom: 16px; font-family: ui-monospace, Menlo, Consolas, monospace; }
    .grid { display: flex; gap: 24px; flex-wrap: wrap; }
    .panel { background: var(--panel); border: 1px solid var(--border); border-radius: 12px; padding: 12px; }
    canvas { background: var(--panel); }
    .legend span { margin-right: 12px; font-size: 12px; font-family: ui-monospace, Menlo, Consolas, monospace; }
    pre { background: var(--panel); border: 1px solid var(--border); border-radius: 12px; padding: 12px; overflow: auto; }
    h1 { margin: 0 0 8px 0; }
    h3 { margin: 0 0 10px 0; }
  </style>
</head>
<body>
  <h1 id="title">System Monitoring Dashboard</h1>
  <div class="links">
    <a href="/api/metrics">/api/metrics</a> |
    <a href="/api/history">/api/history</a> |
    <a href="/api/host">/api/host</a> |
    <a href="/api/health">/api/health</a> |
    <a href="/api/stream">/api/stream</a>
  </div>
  <div class="grid" id="charts"></div>
  <h3 style="margin-top:16px;">Host</h3>
  <pre id="host">Loading...</pre>
  <script>
    const LAYOUT = '__LAYOUT__';
    const CAPACITY = __CAPACITY__;
    const SERIES = [
      { key: 'ram', label: 'RAM Usage (%)', color: '#ef4444' },
      { key: 'cpu', label: 'CPU Usage (%)', color: '#f59e0b' },
      { key: 'disk', label: 'Disk Usage (%)', color: '#10b981' },
      { key: 'swap', label: 'Swap Usage (%)', color: '#3b82f6' },
      { key: 'cache', label: 'Cache Usage (RAM) (%)', color: '#a855f7' },
    ];
    const data = { timestamps: [], ram: [], cpu: [], disk: [], swap: [], cache: [] };

    function push(snap) {
      data.timestamps.push(snap.timestamp);
      data.ram.push(snap.ram_percent);
      data.cpu.push(snap.cpu_percent);
      data.disk.push(snap.disk_percent);
      data.swap.push(snap.swap_percent);
      data.cache.push(snap.cache_percent);
      // Same eviction as the server: drop the oldest point from every column.
      while (data.timestamps.length > CAPACITY) {
        for (const k of Object.keys(data)) data[k].shift();
      }
    }

    function makePanel(title, series) {
      const panel = document.createElement('div');
      panel.className = 'panel';
      const h = document.createElement('h3');
      h.textContent = title;
      const canvas = document.createElement('canvas');
      canvas.width = LAYOUT === 'combined' ? 1080 : 520;
      canvas.height = LAYOUT === 'combined' ? 320 : 180;
      const legend = document.createElement('div');
      legend.className = 'legend';
      for (const s of series) {
        const span = document.createElement('span');
        span.style.color = s.color;
        span.textContent = s.label;
        legend.appendChild(span);
      }
      panel.append(h, canvas, legend);
      document.getElementById('charts').appendChild(panel);
      return { canvas, series };
    }

    const charts = LAYOUT === 'combined'
      ? [makePanel('System Usage Over Time', SERIES)]
      : SERIES.map((s) => makePanel(s.label.replace(' (%)', '') + ' Over Time', [s]));
    document.getElementById('title').textContent +=
      LAYOUT === 'combined' ? ' (Combined Graph)' : ' (Separate Graphs)';

    function fmtTime(ts) {
      return new Date(ts).toTimeString().slice(0, 8);
    }

    function draw(chart) {
      const { canvas, series } = chart;
      const ctx = canvas.getContext('2d');
      const w = canvas.width, h = canvas.height;
      const left = 40, right = 10, top = 10, bottom = 24;
      ctx.clearRect(0, 0, w, h);
      ctx.fillStyle = '#0f1626';
      ctx.fillRect(0, 0, w, h);

      ctx.strokeStyle = '#1c2740';
      ctx.fillStyle = '#9ca3af';
      ctx.font = '11px monospace';
      for (let p = 0; p <= 100; p += 25) {
        const y = top + (h - top - bottom) * (1 - p / 100);
        ctx.beginPath();
        ctx.moveTo(left, y);
        ctx.lineTo(w - right, y);
        ctx.stroke();
        ctx.fillText(p + '%', 4, y + 4);
      }

      const n = data.timestamps.length;
      if (n === 0) return;
      const xAt = (i) => left + (n === 1 ? 0 : (w - left - right) * i / (n - 1));
      ctx.fillText(fmtTime(data.timestamps[0]), left, h - 6);
      ctx.fillText(fmtTime(data.timestamps[n - 1]), w - right - 56, h - 6);

      for (const s of series) {
        const ys = data[s.key];
        ctx.strokeStyle = s.color;
        ctx.fillStyle = s.color;
        ctx.lineWidth = 2;
        ctx.beginPath();
        ys.forEach((v, i) => {
          const y = top + (h - top - bottom) * (1 - Math.max(0, Math.min(100, v)) / 100);
          if (i === 0) ctx.moveTo(xAt(i), y); else ctx.lineTo(xAt(i), y);
        });
        ctx.stroke();
        ys.forEach((v, i) => {
          const y = top + (h - top - bottom) * (1 - Math.max(0, Math.min(100, v)) / 100);
          ctx.beginPath();
          ctx.arc(xAt(i), y, 2.5, 0, Math.PI * 2);
          ctx.fill();
        });
      }
    }

    function redraw() {
      charts.forEach(draw);
    }

    let loaded = false;
    let lastLoaded = -Infinity;
    const pending = [];

    function accept(snap) {
      const t = Date.parse(snap.timestamp);
      if (t <= lastLoaded) return;
      lastLoaded = t;
      push(snap);
    }

    async function loadHistory() {
      const res = await fetch('/api/history');
      const view = await res.json();
      for (const k of Object.keys(data)) data[k] = view[k];
      const n = data.timestamps.length;
      if (n > 0) lastLoaded = Date.parse(data.timestamps[n - 1]);
      // Points streamed while the history request was in flight.
      pending.splice(0).forEach(accept);
      loaded = true;
      redraw();
    }

    async function loadHost() {
      try {
        const res = await fetch('/api/host');
        document.getElementById('host').textContent = JSON.stringify(await res.json(), null, 2);
      } catch (e) {
        document.getElementById('host').textContent = 'unavailable: ' + e;
      }
    }

    function startStream() {
      const es = new EventSource('/api/stream');
      es.onmessage = (ev) => {
        const snap = JSON.parse(ev.data);
        if (!loaded) {
          pending.push(snap);
          return;
        }
        accept(snap);
        redraw();
      };
      return new Promise((resolve) => {
        es.onopen = resolve;
        es.onerror = resolve;
      });
    }

    const HOST_REFRESH_MS = 10000;
    startStream().then(loadHistory);
    loadHost();
    setInterval(loadHost, HOST_REFRESH_MS);
  </script>
</body>
</html>"#;
