use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::aggregate::AggregatorConfig;

/// CLI arguments. Every flag can also come from an `RTT_AGG_*` variable.
#[derive(Parser, Debug, Clone)]
#[command(name = "rtt-aggregator")]
#[command(about = "Aggregates per-observer RTT reports into per-segment latency series")]
#[command(version)]
pub struct Args {
    /// Address the HTTP server binds to
    #[arg(long, env = "RTT_AGG_BIND", default_value = "0.0.0.0:5040")]
    pub bind: SocketAddr,

    /// Number of observers along each path (slot count per session)
    #[arg(
        long,
        env = "RTT_AGG_REPORTERS",
        default_value_t = 2,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub reporters: u32,

    /// EWMA smoothing of incoming RTT samples
    #[arg(
        long,
        env = "RTT_AGG_RTT_SMOOTHING",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub rtt_smoothing: bool,

    /// Samples accepted between two snapshots, minus one
    #[arg(
        long,
        env = "RTT_AGG_FLUSH_THRESHOLD",
        default_value_t = 63,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub flush_threshold: u64,

    /// Evict sessions without events for this long (0 = never)
    #[arg(long, env = "RTT_AGG_SESSION_IDLE_TTL_SECS", default_value_t = 3600)]
    pub session_idle_ttl_secs: u64,

    /// How often the eviction sweep runs
    #[arg(
        long,
        env = "RTT_AGG_EVICT_INTERVAL_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub evict_interval_secs: u64,

    /// Server-Sent Events tick for `/demo/:session/stream` (ms)
    #[arg(
        long,
        env = "RTT_AGG_STREAM_INTERVAL_MS",
        default_value_t = 500,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub stream_interval_ms: u64,

    /// Directory served for all unmatched paths (visualizer)
    #[arg(long, env = "RTT_AGG_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Feed this many synthetic sessions from in-process observers
    #[arg(long, env = "RTT_AGG_SIMULATE", default_value_t = 0)]
    pub simulate: u32,
}

impl Args {
    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            observers: self.reporters as usize,
            smoothing: self.rtt_smoothing,
            flush_threshold: self.flush_threshold,
            idle_ttl: (self.session_idle_ttl_secs > 0)
                .then(|| Duration::from_secs(self.session_idle_ttl_secs)),
        }
    }

    pub fn evict_interval(&self) -> Duration {
        Duration::from_secs(self.evict_interval_secs)
    }

    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_aggregator_defaults() {
        let args = Args::try_parse_from(["rtt-aggregator"]).unwrap();
        assert_eq!(args.bind, "0.0.0.0:5040".parse().unwrap());
        assert_eq!(args.aggregator_config(), AggregatorConfig::default());
        assert_eq!(args.stream_interval(), Duration::from_millis(500));
        assert!(args.static_dir.is_none());
    }

    #[test]
    fn parses_overrides() {
        let args = Args::try_parse_from([
            "rtt-aggregator",
            "--reporters",
            "4",
            "--rtt-smoothing",
            "false",
            "--flush-threshold",
            "1",
            "--session-idle-ttl-secs",
            "0",
        ])
        .unwrap();

        let config = args.aggregator_config();
        assert_eq!(config.observers, 4);
        assert!(!config.smoothing);
        assert_eq!(config.flush_threshold, 1);
        assert_eq!(config.idle_ttl, None);
    }

    #[test]
    fn rejects_zero_observers() {
        assert!(Args::try_parse_from(["rtt-aggregator", "--reporters", "0"]).is_err());
        assert!(Args::try_parse_from(["rtt-aggregator", "--flush-threshold", "0"]).is_err());
    }
}
