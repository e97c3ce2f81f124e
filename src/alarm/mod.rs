mod tokio_scheduler;

pub use tokio_scheduler::TokioAlarmScheduler;

use crate::reminder::{AlarmKind, AlarmPrecision, PendingAlarm};

/// Fires a callback at an absolute wall-clock instant.
///
/// At most one registration exists per [`AlarmKind`]; scheduling a kind again
/// replaces its previous registration. Registrations do not survive a restart.
pub trait AlarmScheduler: Send + Sync {
    fn schedule_absolute(
        &self,
        kind: AlarmKind,
        trigger_epoch_millis: i64,
        precision: AlarmPrecision,
    ) -> anyhow::Result<()>;

    /// Cancelling a kind with nothing registered is a no-op.
    fn cancel(&self, kind: AlarmKind);

    fn pending(&self, kind: AlarmKind) -> Option<PendingAlarm>;

    fn peek(&self, kind: AlarmKind) -> bool {
        self.pending(kind).is_some()
    }
}
