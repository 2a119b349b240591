use crate::application::schedule::NowProvider;
use crate::domain::models::{Reminder, TimeBlock};
use crate::domain::reminder::ReminderTracker;
use crate::infrastructure::config::ReminderSettings;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::notifier::Notifier;
use chrono::Utc;
use log::{info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Read access to the current in-memory schedule.
pub trait BlockSource: Send + Sync {
    fn snapshot(&self) -> Result<Vec<TimeBlock>, InfraError>;
}

struct PollerState {
    source: Arc<dyn BlockSource>,
    notifier: Arc<dyn Notifier>,
    tracker: Mutex<ReminderTracker>,
    now_provider: NowProvider,
    ticks: AtomicU64,
}

impl PollerState {
    fn collect_due(&self) -> Vec<Reminder> {
        let blocks = match self.source.snapshot() {
            Ok(blocks) => blocks,
            Err(error) => {
                warn!("event=reminder_tick module=poller status=error error={error}");
                return Vec::new();
            }
        };
        let Ok(mut tracker) = self.tracker.lock() else {
            warn!("event=reminder_tick module=poller status=error error=tracker lock poisoned");
            return Vec::new();
        };
        tracker.collect_due(&blocks, (self.now_provider)())
    }

    async fn tick(&self) -> usize {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        let due = self.collect_due();
        for reminder in &due {
            // At most once: the block is already marked reminded, failures are not retried.
            if let Err(error) = self.notifier.notify(reminder).await {
                warn!(
                    "event=reminder_notify module=poller status=error block_id={} error={}",
                    reminder.block_id, error
                );
            }
        }
        due.len()
    }
}

/// Fires one reminder per block as its start enters the lead window.
///
/// The poller owns its timer task: `start()` spawns it, `stop()` (or drop)
/// aborts it. Reminded state lives as long as the poller instance.
pub struct ReminderPoller {
    state: Arc<PollerState>,
    poll_interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl ReminderPoller {
    pub fn new(
        source: Arc<dyn BlockSource>,
        notifier: Arc<dyn Notifier>,
        settings: ReminderSettings,
    ) -> Self {
        Self {
            state: Arc::new(PollerState {
                source,
                notifier,
                tracker: Mutex::new(ReminderTracker::new(settings.lead_time_minutes)),
                now_provider: Arc::new(Utc::now),
                ticks: AtomicU64::new(0),
            }),
            poll_interval: settings.poll_interval.max(Duration::from_millis(1)),
            handle: None,
        }
    }

    /// Replaces the clock. Must be called before `start()`.
    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Result<Self, InfraError> {
        let Some(state) = Arc::get_mut(&mut self.state) else {
            return Err(InfraError::InvalidConfig(
                "now provider must be set before the poller starts".to_string(),
            ));
        };
        state.now_provider = now_provider;
        Ok(self)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn tick_count(&self) -> u64 {
        self.state.ticks.load(Ordering::Relaxed)
    }

    /// Spawns the recurring check on the current tokio runtime. The first check
    /// runs one full interval after start. Starting a running poller is a no-op.
    pub fn start(&mut self) -> Result<(), InfraError> {
        if self.handle.is_some() {
            return Ok(());
        }
        let runtime = Handle::try_current().map_err(|error| {
            InfraError::InvalidConfig(format!("reminder poller needs a tokio runtime: {error}"))
        })?;

        let state = Arc::clone(&self.state);
        let period = self.poll_interval;
        self.handle = Some(runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                state.tick().await;
            }
        }));

        info!(
            "event=reminder_poller_started module=poller status=ok interval_ms={}",
            period.as_millis()
        );
        Ok(())
    }

    /// Cancels the timer task. Returns false when the poller was not running.
    pub fn stop(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        handle.abort();
        info!(
            "event=reminder_poller_stopped module=poller status=ok ticks={}",
            self.tick_count()
        );
        true
    }

    /// Runs one check immediately and returns how many reminders fired.
    pub async fn tick(&self) -> usize {
        self.state.tick().await
    }
}

impl Drop for ReminderPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::notifier::InMemoryNotifier;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration};
    use std::sync::atomic::AtomicUsize;

    struct FixedSource {
        blocks: Vec<TimeBlock>,
        reads: AtomicUsize,
    }

    impl FixedSource {
        fn new(blocks: Vec<TimeBlock>) -> Self {
            Self {
                blocks,
                reads: AtomicUsize::new(0),
            }
        }
    }

    impl BlockSource for FixedSource {
        fn snapshot(&self) -> Result<Vec<TimeBlock>, InfraError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.blocks.clone())
        }
    }

    #[derive(Debug, Default)]
    struct FailingNotifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _reminder: &Reminder) -> Result<(), InfraError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(InfraError::Notify("notifications unsupported".to_string()))
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-02-16T08:55:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn block(id: &str, minutes_from_now: i64, completed: bool) -> TimeBlock {
        let start = fixed_now() + ChronoDuration::minutes(minutes_from_now);
        TimeBlock {
            id: id.to_string(),
            start,
            end: start + ChronoDuration::minutes(30),
            label: format!("label {id}"),
            category: "general".to_string(),
            completed,
        }
    }

    fn poller_with(
        blocks: Vec<TimeBlock>,
        notifier: Arc<dyn Notifier>,
    ) -> ReminderPoller {
        ReminderPoller::new(Arc::new(FixedSource::new(blocks)), notifier, ReminderSettings::default())
            .with_now_provider(Arc::new(fixed_now))
            .expect("poller not started")
    }

    #[tokio::test]
    async fn tick_fires_once_per_block() {
        let notifier = Arc::new(InMemoryNotifier::default());
        let poller = poller_with(vec![block("soon", 3, false)], notifier.clone());

        assert_eq!(poller.tick().await, 1);
        assert_eq!(poller.tick().await, 0);
        assert_eq!(notifier.count_for("soon").expect("count"), 1);
        assert_eq!(poller.tick_count(), 2);
    }

    #[tokio::test]
    async fn completed_block_never_fires() {
        let notifier = Arc::new(InMemoryNotifier::default());
        let poller = poller_with(vec![block("done", 2, true)], notifier.clone());

        for _ in 0..5 {
            poller.tick().await;
        }
        assert!(notifier.reminders().expect("reminders").is_empty());
    }

    #[tokio::test]
    async fn failed_notification_is_not_retried() {
        let notifier = Arc::new(FailingNotifier::default());
        let poller = poller_with(vec![block("soon", 1, false)], notifier.clone());

        assert_eq!(poller.tick().await, 1);
        assert_eq!(poller.tick().await, 0);
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn running_poller_ticks_each_interval_and_stops_cleanly() {
        let notifier = Arc::new(InMemoryNotifier::default());
        let mut poller = poller_with(vec![block("soon", 3, false)], notifier.clone());

        poller.start().expect("start poller");
        poller.start().expect("second start is a no-op");
        assert!(poller.is_running());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(poller.tick_count(), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(poller.tick_count(), 1);
        assert_eq!(notifier.count_for("soon").expect("count"), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(poller.tick_count(), 2);
        assert_eq!(notifier.count_for("soon").expect("count"), 1);

        assert!(poller.stop());
        assert!(!poller.stop());
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(poller.tick_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_poller_stops_and_successor_does_not_double_poll() {
        let source = Arc::new(FixedSource::new(vec![block("soon", 3, false)]));
        let notifier = Arc::new(InMemoryNotifier::default());
        let fresh_poller = || {
            ReminderPoller::new(source.clone(), notifier.clone(), ReminderSettings::default())
                .with_now_provider(Arc::new(fixed_now))
                .expect("poller not started")
        };

        let mut first = fresh_poller();
        first.start().expect("start first poller");
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.count_for("soon").expect("count"), 1);

        drop(first);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.count_for("soon").expect("count"), 1);

        let mut second = fresh_poller();
        second.start().expect("start second poller");
        tokio::time::sleep(Duration::from_secs(181)).await;
        // Only the second timer is polling.
        assert_eq!(source.reads.load(Ordering::SeqCst), 4);
        assert_eq!(second.tick_count(), 3);
        // Reminded state is per instance, so the new poller reminds once more.
        assert_eq!(notifier.count_for("soon").expect("count"), 2);
    }

    #[tokio::test]
    async fn clock_cannot_be_replaced_after_start() {
        let notifier = Arc::new(InMemoryNotifier::default());
        let mut poller = poller_with(Vec::new(), notifier);
        poller.start().expect("start poller");

        let result = poller.with_now_provider(Arc::new(fixed_now));
        assert!(matches!(result, Err(InfraError::InvalidConfig(_))));
    }

    #[test]
    fn start_outside_runtime_is_an_error() {
        let notifier = Arc::new(InMemoryNotifier::default());
        let mut poller = poller_with(Vec::new(), notifier);
        assert!(matches!(poller.start(), Err(InfraError::InvalidConfig(_))));
        assert!(!poller.is_running());
    }
}
