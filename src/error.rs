use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Notifications are not permitted at the system level")]
    PermissionDenied,

    #[error("Reminder time is out of range [hour = {hour}, minute = {minute}]")]
    InvalidArgument { hour: i32, minute: i32 },

    #[error("Could not register alarm: {0:#}")]
    SchedulingFault(#[source] anyhow::Error),

    #[error("Could not persist reminder preferences: {0:#}")]
    PersistenceFault(#[source] anyhow::Error),
}
