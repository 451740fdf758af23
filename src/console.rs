use crate::host::collect_host_details;
use crate::metrics::{HostDetails, Snapshot};
use crate::source::SystemSource;
use crate::storage::{HistoryView, SharedHistory};
use chrono::Local;
use crossterm::cursor::MoveTo;
use crossterm::style::{Color, Stylize};
use crossterm::terminal::{Clear, ClearType};
use crossterm::QueueableCommand;
use std::io::{self, stdout, Write};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

const SPARK: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const MAX_PARTITIONS: usize = 5;

/// Host queried for the memory/disk breakdown shown under the charts.
pub type HostSource = Box<dyn SystemSource + Send>;

/// Redraws after every recorded tick. Failed ticks are never broadcast, so
/// the screen keeps showing the last good state.
pub async fn run_console(
    history: Arc<SharedHistory>,
    mut updates: broadcast::Receiver<Snapshot>,
    mut host: Option<HostSource>,
    cancel: CancellationToken,
) {
    if let Err(e) = render_once(&mut stdout(), &history, host.as_mut()) {
        error!("Console render error: {}", e);
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break;
            }
            update = updates.recv() => {
                match update {
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Console skipped {} updates", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                if let Err(e) = render_once(&mut stdout(), &history, host.as_mut()) {
                    error!("Console render error: {}", e);
                }
            }
        }
    }
}

fn render_once<W: Write>(
    out: &mut W,
    history: &SharedHistory,
    host: Option<&mut HostSource>,
) -> io::Result<()> {
    let view = history.current();
    let details = host.and_then(|h| match collect_host_details(&mut **h) {
        Ok(d) => Some(d),
        Err(e) => {
            warn!("Host breakdown unavailable: {}", e);
            None
        }
    });
    render_to(out, &view, details.as_ref())
}

pub fn render_to<W: Write>(
    out: &mut W,
    view: &HistoryView,
    details: Option<&HostDetails>,
) -> io::Result<()> {
    out.queue(MoveTo(0, 0))?;
    out.queue(Clear(ClearType::All))?;

    writeln!(out, "Resource Monitor (console)")?;
    writeln!(out, "Press Ctrl+C to exit.")?;
    writeln!(out)?;

    let Some(last) = view.timestamps.last() else {
        writeln!(out, "Waiting for first sample...")?;
        out.flush()?;
        return Ok(());
    };

    writeln!(
        out,
        "Last sample {}   ({} of {} points)",
        last.with_timezone(&Local).format("%H:%M:%S"),
        view.len(),
        view.capacity
    )?;
    writeln!(out)?;

    let rows: [(&str, &[f64], f64, f64); 5] = [
        ("RAM", &view.ram, 70.0, 90.0),
        ("CPU", &view.cpu, 50.0, 80.0),
        ("Disk", &view.disk, 60.0, 80.0),
        ("Swap", &view.swap, 50.0, 80.0),
        ("Cache", &view.cache, 70.0, 90.0),
    ];
    for (label, values, warn, crit) in rows {
        let current = values.last().copied().unwrap_or(0.0);
        writeln!(
            out,
            "{:<6} {:>16}  {}",
            label,
            color_pct(current, warn, crit),
            sparkline(values)
        )?;
    }

    if let Some(details) = details {
        writeln!(out)?;
        render_details(out, details)?;
    }

    out.flush()?;
    Ok(())
}

fn render_details<W: Write>(out: &mut W, details: &HostDetails) -> io::Result<()> {
    let ram = &details.ram;
    writeln!(
        out,
        "Memory: {} used / {} total, {} available",
        format_bytes(ram.used_bytes),
        format_bytes(ram.total_bytes),
        format_bytes(ram.available_bytes)
    )?;

    match (details.cache.cached_bytes, details.cache.buffers_bytes) {
        (None, None) => writeln!(out, "Cache: not reported on this platform")?,
        (cached, buffers) => writeln!(
            out,
            "Cache: {} cached, {} buffers",
            format_bytes(cached.unwrap_or(0)),
            format_bytes(buffers.unwrap_or(0))
        )?,
    }

    let swap = &details.swap;
    if swap.total_bytes == 0 {
        writeln!(out, "Swap: none configured")?;
    } else {
        writeln!(
            out,
            "Swap: {} used / {} total ({:.1}%)",
            format_bytes(swap.used_bytes),
            format_bytes(swap.total_bytes),
            swap.used_pct
        )?;
    }

    writeln!(out)?;
    if details.partitions.is_empty() {
        writeln!(out, "No partitions detected")?;
        return Ok(());
    }
    writeln!(out, "Partitions:")?;
    for p in details.partitions.iter().take(MAX_PARTITIONS) {
        writeln!(
            out,
            "  {:<12} {:<16} {}  ({} / {})",
            truncate(&p.device, 12),
            truncate(&p.mount_point, 16),
            color_pct(p.used_pct, 60.0, 80.0),
            format_bytes(p.used_bytes),
            format_bytes(p.total_bytes)
        )?;
    }
    Ok(())
}

fn sparkline(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| {
            let level = (v.clamp(0.0, 100.0) / 100.0 * (SPARK.len() - 1) as f64).round();
            SPARK[level as usize]
        })
        .collect()
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn color_pct(value: f64, warn: f64, crit: f64) -> String {
    let s = format!("{value:.1}%");
    if value >= crit {
        s.with(Color::Red).to_string()
    } else if value >= warn {
        s.with(Color::Yellow).to_string()
    } else {
        s.with(Color::Green).to_string()
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    const TB: f64 = GB * 1024.0;

    let b = bytes as f64;
    if b >= TB {
        format!("{:.2} TiB", b / TB)
    } else if b >= GB {
        format!("{:.2} GiB", b / GB)
    } else if b >= MB {
        format!("{:.2} MiB", b / MB)
    } else if b >= KB {
        format!("{:.2} KiB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}
