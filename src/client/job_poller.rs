use crate::client::StatusSource;
use crate::logger::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::future::{BoxFuture, OptionFuture};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);
pub const DEFAULT_DEGRADED_AFTER: u32 = 3;

pub type CompletionCheck<S> = Arc<dyn Fn(&S) -> bool + Send + Sync>;

/// One polling session for one resource.
pub struct PollTarget<S> {
    pub resource_id: String,
    pub source: Arc<dyn StatusSource<S>>,
    pub interval: Duration,
    /// Must be monotone: once true for a job it stays true.
    pub is_complete: CompletionCheck<S>,
}

impl<S> PollTarget<S> {
    pub fn new(
        resource_id: impl Into<String>,
        source: Arc<dyn StatusSource<S>>,
        interval: Duration,
        is_complete: impl Fn(&S) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            source,
            interval,
            is_complete: Arc::new(is_complete),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// No fetch has resolved yet.
    Starting,
    Polling,
    Complete,
}

/// What a poll run currently publishes to its observers.
#[derive(Debug, Clone)]
pub struct PollSnapshot<S> {
    pub phase: PollPhase,
    /// Last successfully fetched status; kept across failed fetches.
    pub status: Option<S>,
    pub consecutive_failures: u32,
    pub degraded: bool,
    pub updated_at: DateTime<Utc>,
}

impl<S> PollSnapshot<S> {
    fn starting() -> Self {
        Self {
            phase: PollPhase::Starting,
            status: None,
            consecutive_failures: 0,
            degraded: false,
            updated_at: Utc::now(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase == PollPhase::Complete
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    /// Consecutive failed fetches before a run is reported degraded; 0 disables.
    pub degraded_after: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            degraded_after: DEFAULT_DEGRADED_AFTER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("resource {0} already completed; reset it before polling again")]
    AlreadyComplete(String),
    #[error("resource {0} is already being polled")]
    AlreadyActive(String),
}

struct ActiveRun {
    run_id: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct PollRegistry {
    active: DashMap<String, ActiveRun>,
    completed: DashMap<String, DateTime<Utc>>,
}

impl PollRegistry {
    // Lock order is always `active` then `completed`.

    /// Claims `resource_id` for a new run. A cancelled run still registered
    /// under the id is replaced; its own cleanup only removes its run id.
    fn claim(&self, resource_id: &str, run: ActiveRun) -> Result<(), PollError> {
        match self.active.entry(resource_id.to_owned()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().cancel.is_cancelled() {
                    return Err(PollError::AlreadyActive(resource_id.to_owned()));
                }
                if self.completed.contains_key(resource_id) {
                    return Err(PollError::AlreadyComplete(resource_id.to_owned()));
                }
                entry.insert(run);
            }
            Entry::Vacant(entry) => {
                if self.completed.contains_key(resource_id) {
                    return Err(PollError::AlreadyComplete(resource_id.to_owned()));
                }
                entry.insert(run);
            }
        }
        Ok(())
    }

    /// Records completion and releases the run's claim in one step.
    fn complete(&self, resource_id: &str, run_id: u64) {
        match self.active.entry(resource_id.to_owned()) {
            Entry::Occupied(entry) if entry.get().run_id == run_id => {
                self.completed.insert(resource_id.to_owned(), Utc::now());
                entry.remove();
            }
            _ => {
                self.completed.insert(resource_id.to_owned(), Utc::now());
            }
        }
    }

    fn release(&self, resource_id: &str, run_id: u64) {
        self.active.remove_if(resource_id, |_, run| run.run_id == run_id);
    }
}

/// Drives status polling for externally executing jobs.
///
/// At most one run is active per resource id, and a resource whose job was
/// observed complete is never fetched again until [`JobPoller::reset`].
pub struct JobPoller {
    config: PollerConfig,
    registry: Arc<PollRegistry>,
    next_run: AtomicU64,
}

impl JobPoller {
    pub fn new(config: PollerConfig) -> Self {
        Self {
            config,
            registry: Arc::new(PollRegistry::default()),
            next_run: AtomicU64::new(1),
        }
    }

    /// Fetches once immediately, then on every interval tick until the job
    /// completes or the run is stopped.
    pub fn start<S>(&self, target: PollTarget<S>) -> Result<PollHandle<S>, PollError>
    where
        S: Clone + Send + Sync + 'static,
    {
        let resource_id = target.resource_id.clone();
        let run_id = self.next_run.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        self.registry.claim(
            &resource_id,
            ActiveRun {
                run_id,
                cancel: cancel.clone(),
            },
        )?;

        let (tx, updates) = watch::channel(PollSnapshot::starting());
        let run = PollRun {
            run_id,
            target,
            config: self.config,
            registry: self.registry.clone(),
            tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(run.execute());

        Ok(PollHandle {
            resource_id,
            run_id,
            cancel,
            registry: self.registry.clone(),
            updates,
            task: Some(task),
        })
    }

    /// Disarms the run's timer; a fetch still in flight is discarded.
    pub fn stop<S>(&self, handle: &PollHandle<S>) {
        handle.cancel.cancel();
        self.registry.release(&handle.resource_id, handle.run_id);
        debug!(resource_id = %handle.resource_id, "polling stopped");
    }

    /// Stops every active run.
    pub fn stop_all(&self) {
        for entry in self.registry.active.iter() {
            entry.cancel.cancel();
        }
        self.registry.active.clear();
    }

    /// Forgets that a resource completed so it may be polled again.
    pub fn reset(&self, resource_id: &str) -> bool {
        self.registry.completed.remove(resource_id).is_some()
    }

    pub fn is_active(&self, resource_id: &str) -> bool {
        self.registry.active.contains_key(resource_id)
    }

    pub fn is_completed(&self, resource_id: &str) -> bool {
        self.registry.completed.contains_key(resource_id)
    }
}

impl Default for JobPoller {
    fn default() -> Self {
        Self::new(PollerConfig::default())
    }
}

/// Owner side of one poll run. Dropping it stops the run.
pub struct PollHandle<S> {
    resource_id: String,
    run_id: u64,
    cancel: CancellationToken,
    registry: Arc<PollRegistry>,
    updates: watch::Receiver<PollSnapshot<S>>,
    task: Option<JoinHandle<()>>,
}

impl<S: Clone> PollHandle<S> {
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn snapshot(&self) -> PollSnapshot<S> {
        self.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot<S>> {
        self.updates.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map(|t| t.is_finished()).unwrap_or(true)
    }

    /// Waits for the run to end without stopping it.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(resource_id = %self.resource_id, "poll task failed: {e}");
            }
        }
    }
}

impl<S> Drop for PollHandle<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.registry.release(&self.resource_id, self.run_id);
    }
}

struct PollRun<S> {
    run_id: u64,
    target: PollTarget<S>,
    config: PollerConfig,
    registry: Arc<PollRegistry>,
    tx: watch::Sender<PollSnapshot<S>>,
    cancel: CancellationToken,
}

impl<S> PollRun<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn execute(self) {
        let resource_id = self.target.resource_id.clone();
        info!(
            %resource_id,
            interval_ms = self.target.interval.as_millis() as u64,
            "polling started"
        );

        let mut failures = 0u32;
        let first = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.target.source.fetch_status() => Some(result),
        };
        let finished = match first {
            Some(result) => self.apply(result, &mut failures),
            None => true,
        };

        if !finished {
            self.poll_on_interval(&mut failures).await;
        }

        self.registry.release(&resource_id, self.run_id);
        debug!(%resource_id, "poll run finished");
    }

    async fn poll_on_interval(&self, failures: &mut u32) {
        let period = self.target.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // single-flight slot: a tick never starts a fetch while this is Some
        let mut in_flight: Option<BoxFuture<'static, anyhow::Result<S>>> = None;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                Some(result) = OptionFuture::from(in_flight.as_mut()), if in_flight.is_some() => {
                    in_flight = None;
                    if self.apply(result, failures) {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if in_flight.is_some() {
                        debug!(resource_id = %self.target.resource_id, "fetch still in flight, skipping tick");
                        continue;
                    }
                    let source = self.target.source.clone();
                    in_flight = Some(Box::pin(async move { source.fetch_status().await }));
                }
            }
        }
    }

    /// Publishes one fetch result. Returns true when the run is over.
    fn apply(&self, result: anyhow::Result<S>, failures: &mut u32) -> bool {
        if self.cancel.is_cancelled() {
            return true;
        }
        let resource_id = &self.target.resource_id;

        match result {
            Ok(status) => {
                let complete = (self.target.is_complete)(&status);
                *failures = 0;
                if complete {
                    self.registry.complete(resource_id, self.run_id);
                }
                self.tx.send_replace(PollSnapshot {
                    phase: if complete {
                        PollPhase::Complete
                    } else {
                        PollPhase::Polling
                    },
                    status: Some(status),
                    consecutive_failures: 0,
                    degraded: false,
                    updated_at: Utc::now(),
                });
                if complete {
                    info!(%resource_id, "job complete, polling disarmed");
                }
                complete
            }
            Err(e) => {
                *failures += 1;
                let consecutive = *failures;
                let threshold = self.config.degraded_after;
                let degraded = threshold > 0 && consecutive >= threshold;
                warn!(%resource_id, consecutive_failures = consecutive, "status fetch failed: {e:#}");
                if degraded && consecutive == threshold {
                    warn!(%resource_id, "status endpoint degraded, still polling");
                }
                // TODO: cap consecutive failures once the service publishes a job timeout
                self.tx.send_modify(|snapshot| {
                    if snapshot.phase == PollPhase::Starting {
                        snapshot.phase = PollPhase::Polling;
                    }
                    snapshot.consecutive_failures = consecutive;
                    snapshot.degraded = degraded;
                    snapshot.updated_at = Utc::now();
                });
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::sleep;

    #[derive(Debug, Clone, PartialEq)]
    struct TestStatus {
        generation_complete: bool,
    }

    enum Step {
        Status(bool),
        Fail,
    }

    struct ScriptedSource {
        script: Mutex<VecDeque<Step>>,
        delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(steps.into()),
                delay,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl StatusSource<TestStatus> for ScriptedSource {
        async fn fetch_status(&self) -> anyhow::Result<TestStatus> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let step = self.script.lock().unwrap().pop_front();
            match step.unwrap_or(Step::Status(false)) {
                Step::Status(generation_complete) => Ok(TestStatus {
                    generation_complete,
                }),
                Step::Fail => Err(anyhow::anyhow!("status endpoint unavailable")),
            }
        }
    }

    fn target(id: &str, source: Arc<ScriptedSource>, interval_ms: u64) -> PollTarget<TestStatus> {
        PollTarget::<TestStatus>::new(
            id,
            source,
            Duration::from_millis(interval_ms),
            |s: &TestStatus| s.generation_complete,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn completes_on_second_tick_and_stops_fetching() {
        let source = ScriptedSource::new(
            vec![Step::Status(false), Step::Status(true)],
            Duration::ZERO,
        );
        let poller = JobPoller::default();
        let handle = poller.start(target("r1", source.clone(), 5000)).unwrap();

        sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls(), 1);
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.phase, PollPhase::Polling);
        assert_eq!(
            snapshot.status,
            Some(TestStatus {
                generation_complete: false
            })
        );

        sleep(Duration::from_millis(5000)).await;
        assert_eq!(source.calls(), 2);
        assert!(handle.snapshot().is_complete());

        sleep(Duration::from_millis(10_000)).await;
        assert_eq!(source.calls(), 2);
        assert!(handle.is_finished());
        assert!(!poller.is_active("r1"));
        assert!(poller.is_completed("r1"));
    }

    #[tokio::test(start_paused = true)]
    async fn complete_on_first_fetch_arms_no_timer() {
        let source = ScriptedSource::new(vec![Step::Status(true)], Duration::ZERO);
        let poller = JobPoller::default();
        let handle = poller.start(target("r1", source.clone(), 5000)).unwrap();

        sleep(Duration::from_millis(30_000)).await;
        assert_eq!(source.calls(), 1);
        assert!(handle.snapshot().is_complete());
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn completed_resource_requires_reset() {
        let source = ScriptedSource::new(vec![Step::Status(true)], Duration::ZERO);
        let poller = JobPoller::default();
        let handle = poller.start(target("r1", source.clone(), 5000)).unwrap();
        handle.join().await;

        let again = poller.start(target("r1", source.clone(), 5000));
        assert!(matches!(again, Err(PollError::AlreadyComplete(id)) if id == "r1"));
        assert_eq!(source.calls(), 1);

        assert!(poller.reset("r1"));
        let handle = poller.start(target("r1", source.clone(), 5000)).unwrap();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls(), 2);
        poller.stop(&handle);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetches_never_overlap() {
        let source = ScriptedSource::new(Vec::new(), Duration::from_millis(12_000));
        let poller = JobPoller::default();
        let handle = poller.start(target("slow", source.clone(), 5000)).unwrap();

        sleep(Duration::from_millis(60_000)).await;
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
        // fetches start at 0s, 17s, 32s and 47s; the ticks in between are skipped
        assert_eq!(source.calls(), 4);
        poller.stop(&handle);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_discards_in_flight_result() {
        let source = ScriptedSource::new(vec![Step::Status(true)], Duration::from_millis(3000));
        let poller = JobPoller::default();
        let handle = poller.start(target("r1", source.clone(), 1000)).unwrap();

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(source.calls(), 1);
        poller.stop(&handle);

        sleep(Duration::from_millis(10_000)).await;
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.phase, PollPhase::Starting);
        assert!(snapshot.status.is_none());
        assert_eq!(source.calls(), 1);
        assert!(!poller.is_active("r1"));
        assert!(!poller.is_completed("r1"));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_discards_result_of_a_tick_fetch() {
        let source = ScriptedSource::new(
            vec![Step::Status(false), Step::Status(true)],
            Duration::from_millis(3000),
        );
        let poller = JobPoller::default();
        let handle = poller.start(target("r1", source.clone(), 5000)).unwrap();

        // first fetch resolves at 3s, the tick at 8s starts a fetch resolving at 11s
        sleep(Duration::from_millis(9000)).await;
        assert_eq!(source.calls(), 2);
        poller.stop(&handle);

        sleep(Duration::from_millis(10_000)).await;
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.phase, PollPhase::Polling);
        assert_eq!(
            snapshot.status,
            Some(TestStatus {
                generation_complete: false
            })
        );
        assert_eq!(source.calls(), 2);
        assert!(!poller.is_completed("r1"));
    }

    #[tokio::test(start_paused = true)]
    async fn failures_degrade_without_stopping() {
        let source = ScriptedSource::new(
            vec![Step::Fail, Step::Fail, Step::Fail, Step::Status(false)],
            Duration::ZERO,
        );
        let poller = JobPoller::new(PollerConfig { degraded_after: 3 });
        let handle = poller.start(target("r1", source.clone(), 1000)).unwrap();

        sleep(Duration::from_millis(1500)).await;
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.consecutive_failures, 2);
        assert!(!snapshot.degraded);

        sleep(Duration::from_millis(1000)).await;
        let snapshot = handle.snapshot();
        assert_eq!(source.calls(), 3);
        assert_eq!(snapshot.consecutive_failures, 3);
        assert!(snapshot.degraded);
        assert_eq!(snapshot.phase, PollPhase::Polling);

        sleep(Duration::from_millis(1000)).await;
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.consecutive_failures, 0);
        assert!(!snapshot.degraded);
        assert!(snapshot.status.is_some());
        poller.stop(&handle);
    }

    #[tokio::test(start_paused = true)]
    async fn one_active_run_per_resource() {
        let source = ScriptedSource::new(Vec::new(), Duration::ZERO);
        let poller = JobPoller::default();
        let first = poller.start(target("r1", source.clone(), 5000)).unwrap();

        let second = poller.start(target("r1", source.clone(), 5000));
        assert!(matches!(second, Err(PollError::AlreadyActive(_))));

        poller.stop(&first);
        let third = poller.start(target("r1", source.clone(), 5000)).unwrap();
        sleep(Duration::from_millis(100)).await;
        assert!(poller.is_active("r1"));
        poller.stop(&third);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_polling() {
        let source = ScriptedSource::new(Vec::new(), Duration::ZERO);
        let poller = JobPoller::default();
        let handle = poller.start(target("r1", source.clone(), 1000)).unwrap();

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(source.calls(), 2);
        drop(handle);

        sleep(Duration::from_millis(5000)).await;
        assert_eq!(source.calls(), 2);
        assert!(!poller.is_active("r1"));
    }

    #[tokio::test(start_paused = true)]
    async fn resource_can_restart_right_after_handle_drop() {
        let source = ScriptedSource::new(Vec::new(), Duration::ZERO);
        let poller = JobPoller::default();
        let handle = poller.start(target("r1", source.clone(), 1000)).unwrap();
        sleep(Duration::from_millis(100)).await;

        drop(handle);
        assert!(!poller.is_active("r1"));
        let again = poller.start(target("r1", source.clone(), 1000)).unwrap();
        assert!(poller.is_active("r1"));

        sleep(Duration::from_millis(100)).await;
        assert!(poller.is_active("r1"));
        assert_eq!(source.calls(), 2);
        poller.stop(&again);
    }

    fn active_run(run_id: u64, cancel: &CancellationToken) -> ActiveRun {
        ActiveRun {
            run_id,
            cancel: cancel.clone(),
        }
    }

    #[test]
    fn claim_replaces_cancelled_run_but_not_live_one() {
        let registry = PollRegistry::default();
        let live = CancellationToken::new();
        registry.claim("r1", active_run(1, &live)).unwrap();
        assert_eq!(
            registry.claim("r1", active_run(2, &CancellationToken::new())),
            Err(PollError::AlreadyActive("r1".to_owned()))
        );

        live.cancel();
        registry
            .claim("r1", active_run(3, &CancellationToken::new()))
            .unwrap();
        // the cancelled run's cleanup leaves the new claim alone
        registry.release("r1", 1);
        assert_eq!(registry.active.get("r1").map(|run| run.run_id), Some(3));
    }

    #[test]
    fn completion_releases_claim_and_blocks_new_runs() {
        let registry = PollRegistry::default();
        registry
            .claim("r1", active_run(1, &CancellationToken::new()))
            .unwrap();

        registry.complete("r1", 1);
        assert!(!registry.active.contains_key("r1"));
        assert!(registry.completed.contains_key("r1"));
        assert_eq!(
            registry.claim("r1", active_run(2, &CancellationToken::new())),
            Err(PollError::AlreadyComplete("r1".to_owned()))
        );
        assert!(!registry.active.contains_key("r1"));
    }
}
