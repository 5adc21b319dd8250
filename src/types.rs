use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable configuration for one scan run.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Number of concurrent workers draining the candidate queue.
    pub threads: usize,
    /// Per-request timeout; an in-flight request is allowed to run this long
    /// even after a stop has been requested.
    pub timeout: Duration,
    /// Skip TLS certificate verification (self-signed lab targets only).
    pub insecure_tls: bool,
    /// Extension suffixes (e.g. ".bak") appended to extensionless candidates.
    pub extensions: Vec<String>,
    /// Run the sensitive-content pattern library over qualifying responses.
    pub detect_sensitive: bool,
    /// Emit a log event for every per-candidate transport failure.
    pub verbose: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            threads: 10,
            timeout: Duration::from_secs_f64(5.0),
            insecure_tls: false,
            extensions: Vec::new(),
            detect_sensitive: false,
            verbose: false,
        }
    }
}

/// One qualifying probe result for a candidate path.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub url: String,
    pub status: u16,
    pub size: u64,
    pub path: String,
    /// Sensitive-content categories matched in the response body, in pattern
    /// table declaration order. Empty when detection is off or nothing matched.
    pub sensitive: Vec<String>,
    pub timestamp: String,
}

/// Aggregate counters for a finished (or stopped) run.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub scanned_total: u64,
    pub scanned_done: u64,
    pub hit_count: u64,
}

/// Summary plus the collected outcomes, for JSON export at the CLI boundary.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ScanReport {
    #[serde(flatten)]
    pub summary: ScanSummary,
    pub entries: Vec<ProbeOutcome>,
}

/// Lifecycle phase of a scan controller. Transitions are monotonic:
/// Idle -> Running -> (Stopping) -> Completed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Stopping,
    Completed,
}

/// Events delivered to the consumer (CLI, embedded web UI) over the run's
/// event channel. `Finished` is emitted exactly once, terminally.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    Log { message: String },
    Progress { processed: u64, total: u64 },
    Result { outcome: ProbeOutcome },
    Finished,
}
