use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use super::AlarmScheduler;
use crate::{
    clock::Clock,
    reminder::{AlarmKind, AlarmPrecision, PendingAlarm},
};

struct ScheduledTask {
    generation: u64,
    alarm: PendingAlarm,
    task_handle: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

impl ScheduledTask {
    fn cancel(self) {
        self.cancellation_token.cancel();
        self.task_handle.abort();
    }
}

type AlarmTaskStore = Mutex<HashMap<AlarmKind, ScheduledTask>>;

/// Alarm scheduler backed by tokio timers.
///
/// Matured alarms are published on the channel returned from [`TokioAlarmScheduler::new`].
/// Timers live in process memory and are gone once the process exits.
pub struct TokioAlarmScheduler {
    tasks: Arc<AlarmTaskStore>,
    next_generation: AtomicU64,
    clock: Arc<dyn Clock>,
    fired_tx: mpsc::UnboundedSender<AlarmKind>,
    inexact_window: Duration,
    runtime: Handle,
}

impl TokioAlarmScheduler {
    /// Must be called from within a tokio runtime.
    pub fn new(
        clock: Arc<dyn Clock>,
        inexact_window: Duration,
    ) -> anyhow::Result<(Self, mpsc::UnboundedReceiver<AlarmKind>)> {
        let runtime = Handle::try_current()?;
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();

        let scheduler = Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            clock,
            fired_tx,
            inexact_window,
            runtime,
        };

        Ok((scheduler, fired_rx))
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<AlarmKind, ScheduledTask>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn delay_until(&self, trigger_epoch_millis: i64, precision: AlarmPrecision) -> Duration {
        let now_millis = self.clock.now().timestamp_millis();
        let millis = u64::try_from(trigger_epoch_millis.saturating_sub(now_millis)).unwrap_or(0);
        let delay = Duration::from_millis(millis);

        match precision {
            AlarmPrecision::Exact => delay,
            AlarmPrecision::Inexact => delay + self.inexact_window,
        }
    }
}

impl AlarmScheduler for TokioAlarmScheduler {
    fn schedule_absolute(
        &self,
        kind: AlarmKind,
        trigger_epoch_millis: i64,
        precision: AlarmPrecision,
    ) -> anyhow::Result<()> {
        let delay = self.delay_until(trigger_epoch_millis, precision);
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let cancellation_token = CancellationToken::new();
        let task_token = cancellation_token.child_token();
        let tasks = Arc::clone(&self.tasks);
        let fired_tx = self.fired_tx.clone();

        // Held across spawn so the timer cannot mature before it is registered.
        let mut registry = self.registry();

        let task_handle = self.runtime.spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {
                    log::debug!("Alarm was cancelled. [kind = {}, generation = {}]", kind, generation);
                }
                _ = tokio::time::sleep(delay) => {
                    let is_current = {
                        let mut tasks = tasks.lock().unwrap_or_else(PoisonError::into_inner);
                        match tasks.get(&kind) {
                            Some(task) if task.generation == generation => {
                                tasks.remove(&kind);
                                true
                            }
                            _ => false,
                        }
                    };

                    if is_current && fired_tx.send(kind).is_err() {
                        log::warn!("Alarm matured but nobody is listening. [kind = {}]", kind);
                    }
                }
            }
        });

        let task = ScheduledTask {
            generation,
            alarm: PendingAlarm {
                kind,
                trigger_epoch_millis,
                precision,
            },
            task_handle,
            cancellation_token,
        };

        if let Some(previous) = registry.insert(kind, task) {
            log::debug!(
                "Replacing alarm registration. [kind = {}, previous_trigger = {}]",
                kind,
                previous.alarm.trigger_epoch_millis
            );
            previous.cancel();
        }

        log::info!(
            "Alarm registered. [kind = {}, request_code = {}, delay = {:?}, precision = {:?}]",
            kind,
            kind.request_code(),
            delay,
            precision
        );

        Ok(())
    }

    fn cancel(&self, kind: AlarmKind) {
        if let Some(task) = self.registry().remove(&kind) {
            log::info!("Alarm cancelled. [kind = {}]", kind);
            task.cancel();
        }
    }

    fn pending(&self, kind: AlarmKind) -> Option<PendingAlarm> {
        self.registry().get(&kind).map(|task| task.alarm)
    }
}

impl Drop for TokioAlarmScheduler {
    fn drop(&mut self) {
        for (_, task) in self.registry().drain() {
            task.cancel();
        }
    }
}
