use crate::domain::models::Reminder;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use log::info;
use std::sync::Mutex;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, reminder: &Reminder) -> Result<(), InfraError>;
}

/// Emits reminders to the log; the default channel when no desktop notifier is wired.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, reminder: &Reminder) -> Result<(), InfraError> {
        info!(
            "event=reminder module=notifier status=ok block_id={} starts_in_minutes={} label={:?}",
            reminder.block_id, reminder.minutes_until_start, reminder.label
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    reminders: Mutex<Vec<Reminder>>,
}

impl InMemoryNotifier {
    pub fn reminders(&self) -> Result<Vec<Reminder>, InfraError> {
        let reminders = self
            .reminders
            .lock()
            .map_err(|error| InfraError::LockPoisoned(format!("notifier lock poisoned: {error}")))?;
        Ok(reminders.clone())
    }

    pub fn count_for(&self, block_id: &str) -> Result<usize, InfraError> {
        Ok(self
            .reminders()?
            .iter()
            .filter(|reminder| reminder.block_id == block_id)
            .count())
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, reminder: &Reminder) -> Result<(), InfraError> {
        let mut reminders = self
            .reminders
            .lock()
            .map_err(|error| InfraError::LockPoisoned(format!("notifier lock poisoned: {error}")))?;
        reminders.push(reminder.clone());
        Ok(())
    }
}
