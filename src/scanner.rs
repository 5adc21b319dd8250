use crate::patterns::PatternLibrary;
use crate::probe;
use crate::types::{ScanEvent, ScanOptions, ScanSummary};
use anyhow::Result;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;

/// Cadence of `progress` events while the pool is draining the queue.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Drain the candidate queue with `options.threads` concurrent workers,
/// publishing qualifying outcomes and periodic progress to the event channel.
///
/// - The queue is pre-filled before any worker spawns; its initial length is
///   the progress denominator.
/// - Each candidate is dequeued and probed at most once; workers exit when
///   the queue is empty or the cancellation token fires.
/// - Per-candidate errors never abort the pool; they surface as log events
///   only when `options.verbose` is set.
/// - Emission order across workers is undefined; consumers must treat the
///   result stream as an unordered set.
pub async fn run_pool(
    candidates: Vec<String>,
    base_url: String,
    options: ScanOptions,
    events: mpsc::UnboundedSender<ScanEvent>,
    cancel: CancellationToken,
) -> Result<ScanSummary> {
    let total = candidates.len() as u64;
    let queue = Arc::new(Mutex::new(VecDeque::from(candidates)));
    let done = Arc::new(AtomicU64::new(0));
    let hits = Arc::new(AtomicU64::new(0));

    // Client and pattern table are owned by this run; workers share them.
    let client = probe::build_client(&options)?;
    let patterns = options
        .detect_sensitive
        .then(|| Arc::new(PatternLibrary::builtin()));

    let mut set = JoinSet::new();
    for _ in 0..options.threads {
        let queue = queue.clone();
        let done = done.clone();
        let hits = hits.clone();
        let client = client.clone();
        let patterns = patterns.clone();
        let events = events.clone();
        let cancel = cancel.clone();
        let base_url = base_url.clone();
        let verbose = options.verbose;

        set.spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    tracing::debug!("worker exiting on cancellation");
                    return;
                }
                let next = queue.lock().await.pop_front();
                let Some(path) = next else {
                    return;
                };

                match probe::probe(&client, &base_url, &path, patterns.as_deref()).await {
                    Ok(Some(outcome)) => {
                        hits.fetch_add(1, Ordering::Relaxed);
                        let _ = events.send(ScanEvent::Log {
                            message: format!("found: {} ({})", outcome.url, outcome.status),
                        });
                        let _ = events.send(ScanEvent::Result { outcome });
                    }
                    // Status outside the whitelist: deliberately silent.
                    Ok(None) => {}
                    Err(err) => {
                        tracing::debug!(path = %path, error = %err, "probe failed");
                        if verbose {
                            let _ = events.send(ScanEvent::Log {
                                message: format!("error probing {path}: {err:#}"),
                            });
                        }
                    }
                }

                done.fetch_add(1, Ordering::Relaxed);
            }
        });
    }

    // Progress aggregator: tick alongside worker joins until all have exited.
    // `processed` is derived from the queue length; the read is weakly
    // consistent, which is fine for display. Once a stop is requested the
    // aggregator goes quiet along with the pool.
    let mut ticker = time::interval(PROGRESS_INTERVAL);
    loop {
        tokio::select! {
            joined = set.join_next() => match joined {
                Some(_) => continue,
                None => break,
            },
            _ = ticker.tick(), if !cancel.is_cancelled() => {
                let remaining = queue.lock().await.len() as u64;
                let _ = events.send(ScanEvent::Progress {
                    processed: total - remaining,
                    total,
                });
            }
        }
    }

    // Final progress on a natural drain only: the queue is empty, so a
    // completed run always ends at processed == total.
    if !cancel.is_cancelled() {
        let remaining = queue.lock().await.len() as u64;
        let _ = events.send(ScanEvent::Progress {
            processed: total - remaining,
            total,
        });
    }

    Ok(ScanSummary {
        scanned_total: total,
        scanned_done: done.load(Ordering::Relaxed),
        hit_count: hits.load(Ordering::Relaxed),
    })
}
