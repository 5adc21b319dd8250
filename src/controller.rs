use crate::scanner;
use crate::types::{RunState, ScanEvent, ScanOptions};
use crate::wordlist::{self, WordlistSource};
use anyhow::{bail, Result};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Owns one scan run's lifecycle: Idle -> Running -> (Stopping) -> Completed.
///
/// A controller is single-use; a fresh run requires a fresh instance. All
/// output flows through the event receiver handed out by [`ScanController::new`],
/// ending with exactly one `Finished` event whether the run completed
/// naturally, was stopped, or aborted on a configuration error.
pub struct ScanController {
    state: Arc<Mutex<RunState>>,
    cancel: CancellationToken,
    done: CancellationToken,
    events: mpsc::UnboundedSender<ScanEvent>,
}

impl ScanController {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Self {
            state: Arc::new(Mutex::new(RunState::Idle)),
            cancel: CancellationToken::new(),
            done: CancellationToken::new(),
            events: tx,
        };
        (controller, rx)
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().expect("state lock")
    }

    /// Start the run. Valid only from Idle; returns immediately while the
    /// worker pool proceeds in the background (requires a tokio runtime).
    ///
    /// Configuration errors (unreadable wordlist, zero threads) are not `Err`:
    /// they are reported through the event stream as a log line plus an
    /// immediate `Finished`, with no workers started.
    pub fn start(
        &self,
        target: &str,
        source: WordlistSource,
        options: ScanOptions,
    ) -> Result<()> {
        let mut st = self.state.lock().expect("state lock");
        if *st != RunState::Idle {
            bail!("scan controller is single-use and was already started");
        }

        if options.threads == 0 {
            return self.abort_config(&mut st, "thread count must be positive".into());
        }

        let content = match wordlist::load_source(&source) {
            Ok(content) => content,
            Err(err) => return self.abort_config(&mut st, format!("{err:#}")),
        };
        let candidates = wordlist::expand_candidates(&content, &options.extensions);
        let target = target.trim_end_matches('/').to_string();

        self.log(format!("starting scan: {target}"));
        self.log(format!("dictionary size: {} paths", candidates.len()));
        self.log(format!("threads: {}", options.threads));
        *st = RunState::Running;
        drop(st);

        let state = self.state.clone();
        let events = self.events.clone();
        let cancel = self.cancel.clone();
        let done = self.done.clone();
        tokio::spawn(async move {
            let res = scanner::run_pool(candidates, target, options, events.clone(), cancel).await;
            {
                let mut st = state.lock().expect("state lock");
                let stopped = *st == RunState::Stopping;
                *st = RunState::Completed;
                let message = match (&res, stopped) {
                    (Ok(s), true) => format!(
                        "scan stopped: {}/{} paths probed, {} hits",
                        s.scanned_done, s.scanned_total, s.hit_count
                    ),
                    (Ok(s), false) => format!(
                        "scan complete: {} hits across {} paths",
                        s.hit_count, s.scanned_total
                    ),
                    (Err(err), _) => format!("scan failed: {err:#}"),
                };
                let _ = events.send(ScanEvent::Log { message });
            }
            let _ = events.send(ScanEvent::Finished);
            done.cancel();
        });

        Ok(())
    }

    /// Request cancellation. Workers observe the signal at their next dequeue
    /// boundary; an in-flight request may still run up to its timeout, so
    /// stop is prompt but not instant.
    pub fn stop(&self) {
        let mut st = self.state.lock().expect("state lock");
        if *st == RunState::Running {
            *st = RunState::Stopping;
            self.cancel.cancel();
            let _ = self.events.send(ScanEvent::Log {
                message: "stopping scan...".into(),
            });
        }
    }

    /// Resolves once the terminal `Finished` event has been emitted. Callers
    /// wanting a synchronous stop should race this against their own timeout.
    pub async fn wait_finished(&self) {
        self.done.cancelled().await
    }

    fn abort_config(&self, st: &mut RunState, reason: String) -> Result<()> {
        self.log(format!("configuration error: {reason}"));
        *st = RunState::Completed;
        let _ = self.events.send(ScanEvent::Finished);
        self.done.cancel();
        Ok(())
    }

    fn log(&self, message: String) {
        let _ = self.events.send(ScanEvent::Log { message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ScanEvent>) -> Vec<ScanEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[tokio::test]
    async fn unreadable_wordlist_aborts_before_workers() {
        let (ctl, mut rx) = ScanController::new();
        ctl.start(
            "http://127.0.0.1:1",
            WordlistSource::FilePath("/nonexistent/wordlist.txt".into()),
            ScanOptions::default(),
        )
        .expect("start from idle");

        assert_eq!(ctl.state(), RunState::Completed);
        let events = drain(&mut rx);
        assert!(matches!(events.last(), Some(ScanEvent::Finished)));
        assert!(events.iter().any(
            |e| matches!(e, ScanEvent::Log { message } if message.contains("configuration error"))
        ));
        assert!(!events
            .iter()
            .any(|e| matches!(e, ScanEvent::Result { .. })));
    }

    #[tokio::test]
    async fn zero_threads_is_a_configuration_error() {
        let (ctl, mut rx) = ScanController::new();
        let options = ScanOptions {
            threads: 0,
            ..ScanOptions::default()
        };
        ctl.start(
            "http://127.0.0.1:1",
            WordlistSource::Inline(vec!["admin".into()]),
            options,
        )
        .expect("start from idle");

        assert_eq!(ctl.state(), RunState::Completed);
        let events = drain(&mut rx);
        assert!(matches!(events.last(), Some(ScanEvent::Finished)));
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let (ctl, _rx) = ScanController::new();
        ctl.start(
            "http://127.0.0.1:1",
            WordlistSource::FilePath("/nonexistent/wordlist.txt".into()),
            ScanOptions::default(),
        )
        .expect("first start");
        let again = ctl.start(
            "http://127.0.0.1:1",
            WordlistSource::Inline(vec!["admin".into()]),
            ScanOptions::default(),
        );
        assert!(again.is_err());
    }
}
