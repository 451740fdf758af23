use clap::{Args, ValueEnum};
use std::time::Duration;

/// Web dashboard keeps this many points.
pub const DASHBOARD_HISTORY: usize = 20;
/// Console demo keeps this many points.
pub const DEMO_HISTORY: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Console,
    Web,
    Both,
}

impl Mode {
    pub fn web_enabled(self) -> bool {
        matches!(self, Mode::Web | Mode::Both)
    }

    pub fn console_enabled(self) -> bool {
        matches!(self, Mode::Console | Mode::Both)
    }
}

/// How the web page lays out the five metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Layout {
    /// All metrics in one chart.
    Combined,
    /// One chart per metric.
    Separate,
}

/// Sampling options shared by every binary.
#[derive(Clone, Debug, Args)]
pub struct MonitorArgs {
    /// Sampling interval in seconds
    #[arg(long, default_value_t = 2, value_parser = parse_interval_secs)]
    pub interval_secs: u64,

    /// History depth (number of samples kept in memory)
    #[arg(long, value_parser = parse_history)]
    pub history: Option<usize>,
}

impl MonitorArgs {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn history_or(&self, default: usize) -> usize {
        self.history.unwrap_or(default)
    }
}

fn parse_interval_secs(s: &str) -> Result<u64, String> {
    let secs: u64 = s.parse().map_err(|e| format!("invalid interval: {e}"))?;
    if secs == 0 {
        return Err("interval must be at least 1 second".to_string());
    }
    Ok(secs)
}

fn parse_history(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("invalid history depth: {e}"))?;
    if n == 0 {
        return Err("history depth must be at least 1".to_string());
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        monitor: MonitorArgs,
    }

    #[test]
    fn defaults() {
        let cli = TestCli::try_parse_from(["test"]).unwrap();
        assert_eq!(cli.monitor.interval(), Duration::from_secs(2));
        assert_eq!(cli.monitor.history_or(DASHBOARD_HISTORY), 20);
        assert_eq!(cli.monitor.history_or(DEMO_HISTORY), 50);
    }

    #[test]
    fn explicit_history_wins() {
        let cli = TestCli::try_parse_from(["test", "--history", "7"]).unwrap();
        assert_eq!(cli.monitor.history_or(DEMO_HISTORY), 7);
    }

    #[test]
    fn rejects_sub_second_interval_and_empty_history() {
        assert!(TestCli::try_parse_from(["test", "--interval-secs", "0"]).is_err());
        assert!(TestCli::try_parse_from(["test", "--history", "0"]).is_err());
    }

    #[test]
    fn mode_flags() {
        assert!(Mode::Both.web_enabled() && Mode::Both.console_enabled());
        assert!(!Mode::Web.console_enabled());
        assert!(!Mode::Console.web_enabled());
    }
}
