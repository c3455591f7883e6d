//! Refresh coordinator.
//!
//! A single task owns the signal list and every piece of refresh state.
//! Three kinds of input reach it:
//! - local store bumps and push messages, which (re)arm a debounce timer
//! - filter changes, which cancel the timer and fetch at once
//! - manual retries, which fetch at once unless a fetch is outstanding
//!
//! Every fetch is tagged with a sequence number. Only the response of the
//! most recently started fetch is applied; older ones are stale. A debounce
//! or retry that fires while the latest fetch is still outstanding sets a
//! pending flag and exactly one follow-up fetch starts when it completes.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use serde::Serialize;
use sigfeed_core::{
    with_timeout, ApiError, ApiResult, DynSignalSource, PushMessage, Signal, SignalFilters,
    SignalPage,
};
use sigfeed_telemetry::Metrics;
use sigfeed_ws::{PushChannel, Subscription};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Command queue depth. Push triggers beyond this are dropped; the
/// debounce already coalesces them.
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// What asked for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Store,
    Push,
    Filter,
    Retry,
    /// Debounce timer or pending follow-up.
    Debounce,
}

impl TriggerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Push => "push",
            Self::Filter => "filter",
            Self::Retry => "retry",
            Self::Debounce => "debounce",
        }
    }
}

/// Externally visible list state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedState {
    pub signals: Vec<Signal>,
    pub total: u64,
    pub loading: bool,
    /// Last list fetch failure, cleared by the next success.
    pub error: Option<String>,
    /// Filters the next fetch will use.
    pub filters: SignalFilters,
    /// Sequence number of the fetch reflected in `signals`.
    pub applied_seq: u64,
}

/// How a completed fetch was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Applied,
    /// Superseded by a newer fetch; discarded.
    Stale,
    Failed(ApiError),
}

impl FetchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Stale => "stale",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug)]
enum Command {
    SetFilters(SignalFilters),
    Retry,
    Trigger(TriggerSource),
}

struct FetchDone {
    seq: u64,
    result: ApiResult<SignalPage>,
    elapsed: Duration,
}

/// Cloneable handle to a running coordinator.
#[derive(Clone)]
pub struct RefreshHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<FeedState>,
    shutdown: CancellationToken,
}

impl RefreshHandle {
    /// Replace the filters and fetch immediately.
    pub async fn set_filters(&self, filters: SignalFilters) -> SyncResult<()> {
        self.send(Command::SetFilters(filters)).await
    }

    /// User-initiated "try again".
    pub async fn retry(&self) -> SyncResult<()> {
        self.send(Command::Retry).await
    }

    /// Arm the debounce timer.
    pub async fn trigger(&self, source: TriggerSource) -> SyncResult<()> {
        self.send(Command::Trigger(source)).await
    }

    /// Non-blocking `trigger`. Returns `false` if the queue is full or closed.
    pub fn try_trigger(&self, source: TriggerSource) -> bool {
        self.commands.try_send(Command::Trigger(source)).is_ok()
    }

    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Debounced refresh on every `signals:new` / `signals:ai_complete`
    /// message, for as long as the returned subscription is held.
    pub fn attach_push(&self, channel: &dyn PushChannel) -> Subscription {
        let handle = self.clone();
        channel.subscribe(std::sync::Arc::new(move |msg: &PushMessage| {
            if msg.kind.is_signal_change() && !handle.try_trigger(TriggerSource::Push) {
                debug!(kind = %msg.kind, "Refresh queue full, push trigger coalesced");
            }
        }))
    }

    async fn send(&self, command: Command) -> SyncResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SyncError::CoordinatorStopped)
    }
}

/// Coordinator task state.
pub struct RefreshCoordinator {
    source: DynSignalSource,
    debounce: Duration,
    fetch_timeout: Option<Duration>,
    store: watch::Receiver<i64>,
    commands: mpsc::Receiver<Command>,
    state_tx: watch::Sender<FeedState>,
    done_tx: mpsc::UnboundedSender<FetchDone>,
    done_rx: mpsc::UnboundedReceiver<FetchDone>,
    shutdown: CancellationToken,

    filters: SignalFilters,
    latest_seq: u64,
    latest_outstanding: bool,
    pending: bool,
    deadline: Option<Instant>,
}

impl RefreshCoordinator {
    /// Start the coordinator and its initial fetch.
    pub fn spawn(
        source: DynSignalSource,
        store: watch::Receiver<i64>,
        config: &SyncConfig,
        shutdown: CancellationToken,
    ) -> (RefreshHandle, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let initial = FeedState {
            filters: config.filters.clone(),
            ..FeedState::default()
        };
        let (state_tx, state_rx) = watch::channel(initial);

        let coordinator = Self {
            source,
            debounce: config.debounce(),
            fetch_timeout: config.fetch_timeout(),
            store,
            commands: cmd_rx,
            state_tx,
            done_tx,
            done_rx,
            shutdown: shutdown.clone(),
            filters: config.filters.clone(),
            latest_seq: 0,
            latest_outstanding: false,
            pending: false,
            deadline: None,
        };

        let handle = RefreshHandle {
            commands: cmd_tx,
            state: state_rx,
            shutdown,
        };
        (handle, tokio::spawn(coordinator.run()))
    }

    async fn run(mut self) {
        info!(
            debounce_ms = self.debounce.as_millis() as u64,
            "Refresh coordinator started"
        );
        // Bumps before startup are covered by the initial fetch.
        self.store.borrow_and_update();
        let mut store_open = true;
        let mut commands_open = true;

        self.start_fetch(TriggerSource::Filter);

        loop {
            let deadline = self.deadline;
            let debounce_elapsed = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now));
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                Some(done) = self.done_rx.recv() => {
                    self.complete(done);
                }

                cmd = self.commands.recv(), if commands_open => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => commands_open = false,
                },

                changed = self.store.changed(), if store_open => {
                    if changed.is_err() {
                        debug!("Change store dropped");
                        store_open = false;
                    } else {
                        self.store.borrow_and_update();
                        self.arm_debounce(TriggerSource::Store);
                    }
                }

                () = debounce_elapsed, if deadline.is_some() => {
                    self.deadline = None;
                    self.request_fetch(TriggerSource::Debounce);
                }
            }
        }

        info!("Refresh coordinator stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::SetFilters(filters) => {
                Metrics::refresh_trigger(TriggerSource::Filter.as_str());
                debug!(?filters, "Filter change, fetching immediately");
                self.filters = filters.clone();
                self.deadline = None;
                self.pending = false;
                self.state_tx.send_modify(|s| s.filters = filters);
                self.start_fetch(TriggerSource::Filter);
            }
            Command::Retry => {
                Metrics::refresh_trigger(TriggerSource::Retry.as_str());
                self.deadline = None;
                self.request_fetch(TriggerSource::Retry);
            }
            Command::Trigger(source) => self.arm_debounce(source),
        }
    }

    fn arm_debounce(&mut self, source: TriggerSource) {
        Metrics::refresh_trigger(source.as_str());
        self.deadline = Some(Instant::now() + self.debounce);
        debug!(source = source.as_str(), "Debounce armed");
    }

    /// Fetch now, or defer to a single follow-up if the latest fetch is
    /// still outstanding.
    fn request_fetch(&mut self, source: TriggerSource) {
        if self.latest_outstanding {
            debug!(
                source = source.as_str(),
                seq = self.latest_seq,
                "Fetch outstanding, follow-up pending"
            );
            self.pending = true;
        } else {
            self.start_fetch(source);
        }
    }

    fn start_fetch(&mut self, source: TriggerSource) {
        self.latest_seq += 1;
        self.latest_outstanding = true;
        let seq = self.latest_seq;
        debug!(seq, source = source.as_str(), "Starting list fetch");

        self.state_tx.send_modify(|s| s.loading = true);

        let fetch = self.source.clone();
        let filters = self.filters.clone();
        let limit = self.fetch_timeout;
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let result = with_timeout(fetch.fetch_signals(filters), limit).await;
            let _ = done_tx.send(FetchDone {
                seq,
                result,
                elapsed: started.elapsed(),
            });
        });
    }

    fn complete(&mut self, done: FetchDone) -> FetchOutcome {
        Metrics::list_fetch_latency(done.elapsed.as_secs_f64() * 1000.0);

        let outcome = if done.seq != self.latest_seq {
            debug!(
                seq = done.seq,
                latest = self.latest_seq,
                "Discarding stale list response"
            );
            FetchOutcome::Stale
        } else {
            self.latest_outstanding = false;
            let follow_up = self.pending;
            match done.result {
                Ok(page) => {
                    debug!(
                        seq = done.seq,
                        count = page.signals.len(),
                        total = page.total,
                        "List fetch applied"
                    );
                    self.state_tx.send_modify(|s| {
                        s.signals = page.signals;
                        s.total = page.total;
                        s.loading = follow_up;
                        s.error = None;
                        s.applied_seq = done.seq;
                    });
                    FetchOutcome::Applied
                }
                Err(e) => {
                    warn!(seq = done.seq, error = %e, "List fetch failed");
                    let message = e.to_string();
                    self.state_tx.send_modify(|s| {
                        s.loading = follow_up;
                        s.error = Some(message);
                    });
                    FetchOutcome::Failed(e)
                }
            }
        };

        Metrics::list_fetch(outcome.label());

        if outcome != FetchOutcome::Stale && self.pending {
            self.pending = false;
            self.start_fetch(TriggerSource::Debounce);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_store::ChangeStore;
    use chrono::Utc;
    use parking_lot::Mutex;
    use sigfeed_core::{BoxFuture, Direction, SignalId, SignalSource, SignalStatus};
    use sigfeed_ws::PushBus;
    use std::sync::Arc;
    use tokio_test::assert_ok;

    /// Records every call. Long-filtered calls are slow, everything else fast.
    #[derive(Default)]
    struct ScriptedSource {
        calls: Mutex<Vec<SignalFilters>>,
        fail_next: Mutex<bool>,
    }

    impl ScriptedSource {
        fn calls(&self) -> Vec<SignalFilters> {
            self.calls.lock().clone()
        }
    }

    impl SignalSource for ScriptedSource {
        fn fetch_signals(&self, filters: SignalFilters) -> BoxFuture<'_, ApiResult<SignalPage>> {
            self.calls.lock().push(filters.clone());
            let fail = std::mem::take(&mut *self.fail_next.lock());
            Box::pin(async move {
                let delay = match filters.direction {
                    Some(Direction::Long) => 500,
                    _ => 50,
                };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                if fail {
                    return Err(ApiError::Http {
                        status: 503,
                        body: "maintenance".into(),
                    });
                }
                let pair = match filters.direction {
                    Some(Direction::Long) => "LONG-ONLY",
                    Some(Direction::Short) => "SHORT-ONLY",
                    None => "ALL",
                };
                Ok(SignalPage {
                    signals: vec![Signal {
                        id: SignalId::new(1),
                        pair: pair.into(),
                        direction: Direction::Long,
                        status: SignalStatus::Raw,
                        entry: None,
                        stop_loss: None,
                        take_profits: None,
                        ai_entry: None,
                        ai_stop_loss: None,
                        ai_take_profits: None,
                        strategy: None,
                        timeframe: None,
                        created_at: Utc::now(),
                    }],
                    total: 1,
                })
            })
        }
    }

    struct Harness {
        source: Arc<ScriptedSource>,
        store: ChangeStore,
        handle: RefreshHandle,
        task: JoinHandle<()>,
    }

    async fn start(config: SyncConfig) -> Harness {
        let source = Arc::new(ScriptedSource::default());
        let store = ChangeStore::default();
        let (handle, task) = RefreshCoordinator::spawn(
            source.clone(),
            store.subscribe(),
            &config,
            CancellationToken::new(),
        );
        // Let the initial fetch finish.
        tokio::time::sleep(Duration::from_secs(1)).await;
        Harness {
            source,
            store,
            handle,
            task,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_fetch_uses_configured_filters() {
        let config = SyncConfig {
            filters: SignalFilters::default().with_direction(Some(Direction::Short)),
            ..Default::default()
        };
        let h = start(config).await;
        assert_eq!(h.source.calls().len(), 1);
        let state = h.handle.state();
        assert_eq!(state.signals[0].pair, "SHORT-ONLY");
        assert_eq!(state.applied_seq, 1);
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_triggers_yields_one_fetch() {
        let h = start(SyncConfig::default()).await;

        for i in 0..5 {
            if i % 2 == 0 {
                h.store.bump();
            } else {
                assert_ok!(h.handle.trigger(TriggerSource::Push).await);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        // Still inside the window measured from the last trigger.
        assert_eq!(h.source.calls().len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.source.calls().len(), 2);
        assert_eq!(h.handle.state().applied_seq, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_fetch_uses_filters_in_effect() {
        let h = start(SyncConfig::default()).await;
        let short = SignalFilters::default().with_direction(Some(Direction::Short));
        assert_ok!(h.handle.set_filters(short.clone()).await);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(h.source.calls().len(), 2);

        for i in 0..4 {
            if i % 2 == 0 {
                h.store.bump();
            } else {
                assert_ok!(h.handle.trigger(TriggerSource::Push).await);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;

        let calls = h.source.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls.last(), Some(&short));
        assert_eq!(h.handle.state().signals[0].pair, "SHORT-ONLY");
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_change_bypasses_and_cancels_debounce() {
        let h = start(SyncConfig::default()).await;

        h.store.bump();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let short = SignalFilters::default().with_direction(Some(Direction::Short));
        assert_ok!(h.handle.set_filters(short.clone()).await);

        // Immediate, well before the 300ms debounce would have fired.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(h.source.calls().len(), 2);
        assert_eq!(h.source.calls()[1], short);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.source.calls().len(), 2);
        let state = h.handle.state();
        assert_eq!(state.signals[0].pair, "SHORT-ONLY");
        assert_eq!(state.filters, short);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_discarded() {
        let h = start(SyncConfig::default()).await;
        let mut rx = h.handle.subscribe();

        // Slow fetch with the old filter, superseded by a fast one.
        let long = SignalFilters::default().with_direction(Some(Direction::Long));
        let short = SignalFilters::default().with_direction(Some(Direction::Short));
        assert_ok!(h.handle.set_filters(long).await);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_ok!(h.handle.set_filters(short).await);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let state = rx.borrow_and_update().clone();
        assert_eq!(h.source.calls().len(), 3);
        assert_eq!(state.signals[0].pair, "SHORT-ONLY");
        assert_eq!(state.applied_seq, 3);
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_during_fetch_coalesces_into_one_follow_up() {
        let config = SyncConfig {
            filters: SignalFilters::default().with_direction(Some(Direction::Long)),
            ..Default::default()
        };
        let h = start(config).await;
        assert_eq!(h.source.calls().len(), 1);

        // Retry starts a 500ms fetch; two debounces fire while it runs.
        assert_ok!(h.handle.retry().await);
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.store.bump();
        tokio::time::sleep(Duration::from_millis(310)).await;
        assert!(h.handle.state().loading);
        assert_ok!(h.handle.trigger(TriggerSource::Push).await);
        assert_ok!(h.handle.retry().await);

        tokio::time::sleep(Duration::from_secs(3)).await;
        // Initial + retry + exactly one follow-up.
        assert_eq!(h.source.calls().len(), 3);
        assert!(!h.handle.state().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_surfaces_error_and_retry_recovers() {
        let h = start(SyncConfig::default()).await;
        let before = h.handle.state().signals;

        *h.source.fail_next.lock() = true;
        assert_ok!(h.handle.retry().await);
        tokio::time::sleep(Duration::from_secs(1)).await;
        let failed = h.handle.state();
        assert_eq!(failed.error.as_deref(), Some("HTTP 503: maintenance"));
        assert_eq!(failed.signals, before);
        assert!(!failed.loading);

        // No automatic retry.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.source.calls().len(), 2);

        assert_ok!(h.handle.retry().await);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.handle.state().error, None);
        assert_eq!(h.source.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_channel_triggers_on_signal_tags_only() {
        let h = start(SyncConfig::default()).await;
        let bus = PushBus::new();
        let _sub = h.handle.attach_push(&bus);

        bus.publish(&PushMessage::parse(r#"{"type":"user:login"}"#).unwrap());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.source.calls().len(), 1);

        let msg = PushMessage::parse(r#"{"type":"signals:ai_complete","signal_id":1}"#).unwrap();
        bus.publish(&msg);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.source.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_fetch_times_out() {
        struct Hang;
        impl SignalSource for Hang {
            fn fetch_signals(&self, _: SignalFilters) -> BoxFuture<'_, ApiResult<SignalPage>> {
                Box::pin(std::future::pending())
            }
        }

        let config = SyncConfig {
            fetch_timeout_ms: 1_000,
            ..Default::default()
        };
        let (handle, _task) = RefreshCoordinator::spawn(
            Arc::new(Hang),
            ChangeStore::default().subscribe(),
            &config,
            CancellationToken::new(),
        );
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(handle.state().loading);
        tokio::time::sleep(Duration::from_secs(1)).await;
        let state = handle.state();
        assert!(!state.loading);
        assert!(state.error.unwrap().contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_task() {
        let h = start(SyncConfig::default()).await;
        h.handle.shutdown();
        h.task.await.unwrap();
        assert_eq!(
            h.handle.retry().await,
            Err(SyncError::CoordinatorStopped)
        );
    }
}
