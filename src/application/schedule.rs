use crate::application::bootstrap::bootstrap_workspace;
use crate::application::reminder_poller::BlockSource;
use crate::domain::conflict::find_conflict;
use crate::domain::day_filter::{blocks_on_day, todays_blocks};
use crate::domain::models::{Admission, Interval, Rejection, RejectionReason, TimeBlock, TimeBlockDraft};
use crate::infrastructure::config::{read_reminder_settings, read_timezone, ReminderSettings};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::kv_store::{KeyValueStore, SqliteKeyValueStore};
use crate::infrastructure::time_block_store::{sample_blocks, TimeBlockStore};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use log::{info, warn};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

/// The schedule surface used by the dashboard: admission, day view and the
/// completion/deletion toggles, backed by a [`TimeBlockStore`].
pub struct ScheduleService<K: KeyValueStore> {
    store: TimeBlockStore<K>,
    timezone: Tz,
    reminder_settings: ReminderSettings,
    now_provider: NowProvider,
    blocks: Mutex<Vec<TimeBlock>>,
}

impl ScheduleService<SqliteKeyValueStore> {
    pub fn open(workspace_root: &Path) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(workspace_root)?;
        let timezone = read_timezone(&bootstrap.config_dir)?;
        let reminder_settings = read_reminder_settings(&bootstrap.config_dir)?;

        let kv = Arc::new(SqliteKeyValueStore::open(&bootstrap.database_path)?);
        let store = TimeBlockStore::new(kv, sample_blocks(Utc::now(), timezone));
        Ok(Self::new(store, timezone).with_reminder_settings(reminder_settings))
    }
}

impl<K: KeyValueStore> ScheduleService<K> {
    /// Loads the initial set. An unreadable slot starts the session from the
    /// seed set; the store backs the damaged payload up before the first write.
    pub fn new(store: TimeBlockStore<K>, timezone: Tz) -> Self {
        let blocks = store.try_load().unwrap_or_else(|_| store.seed().to_vec());
        Self {
            store,
            timezone,
            reminder_settings: ReminderSettings::default(),
            now_provider: Arc::new(Utc::now),
            blocks: Mutex::new(blocks),
        }
    }

    pub fn with_reminder_settings(mut self, reminder_settings: ReminderSettings) -> Self {
        self.reminder_settings = reminder_settings;
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn reminder_settings(&self) -> ReminderSettings {
        self.reminder_settings
    }

    /// Re-reads the persisted collection and replaces the in-memory set with it.
    /// When the read fails the current set keeps serving and is returned.
    pub fn load(&self) -> Result<Vec<TimeBlock>, InfraError> {
        let loaded = self.store.try_load();
        let mut blocks = self.lock_blocks()?;
        match loaded {
            Ok(loaded) => *blocks = loaded,
            Err(error) => warn!(
                "event=time_blocks_reload module=schedule status=kept_in_memory count={} error={}",
                blocks.len(),
                error
            ),
        }
        Ok(blocks.clone())
    }

    pub fn blocks(&self) -> Result<Vec<TimeBlock>, InfraError> {
        Ok(self.lock_blocks()?.clone())
    }

    pub fn add_time_block(&self, draft: TimeBlockDraft) -> Result<Admission, InfraError> {
        draft.validate().map_err(InfraError::Validation)?;

        let mut blocks = self.lock_blocks()?;
        if let Some(conflicting) = find_conflict(&draft.interval(), &blocks) {
            warn!(
                "event=time_block_rejected module=schedule status=conflict label={:?} start={} end={} conflicting_id={}",
                draft.label,
                draft.start.to_rfc3339(),
                draft.end.to_rfc3339(),
                conflicting.id
            );
            return Ok(Admission::Rejected(Rejection {
                reason: RejectionReason::Conflict,
                conflicting: conflicting.clone(),
            }));
        }

        let block = draft.into_block(next_id("blk"));
        blocks.push(block.clone());
        self.store.save(&blocks);

        info!(
            "event=time_block_admitted module=schedule status=ok block_id={} start={} end={}",
            block.id,
            block.start.to_rfc3339(),
            block.end.to_rfc3339()
        );
        Ok(Admission::Admitted(block))
    }

    pub fn conflicts_with(&self, interval: &Interval) -> Result<Option<TimeBlock>, InfraError> {
        let blocks = self.lock_blocks()?;
        Ok(find_conflict(interval, &blocks).cloned())
    }

    pub fn todays_blocks(&self) -> Result<Vec<TimeBlock>, InfraError> {
        let blocks = self.lock_blocks()?;
        Ok(todays_blocks(&blocks, (self.now_provider)(), self.timezone))
    }

    pub fn blocks_on(&self, day: NaiveDate) -> Result<Vec<TimeBlock>, InfraError> {
        let blocks = self.lock_blocks()?;
        Ok(blocks_on_day(&blocks, day, self.timezone))
    }

    pub fn set_completed(&self, block_id: &str, completed: bool) -> Result<TimeBlock, InfraError> {
        let block_id = block_id.trim();
        let mut blocks = self.lock_blocks()?;
        let Some(block) = blocks.iter_mut().find(|block| block.id == block_id) else {
            return Err(InfraError::NotFound(format!("time block not found: {block_id}")));
        };
        block.completed = completed;
        let updated = block.clone();
        self.store.save(&blocks);

        info!(
            "event=time_block_completed module=schedule status=ok block_id={block_id} completed={completed}"
        );
        Ok(updated)
    }

    pub fn delete_time_block(&self, block_id: &str) -> Result<bool, InfraError> {
        let block_id = block_id.trim();
        let mut blocks = self.lock_blocks()?;
        let before = blocks.len();
        blocks.retain(|block| block.id != block_id);
        if blocks.len() == before {
            return Ok(false);
        }
        self.store.save(&blocks);

        info!("event=time_block_deleted module=schedule status=ok block_id={block_id}");
        Ok(true)
    }

    fn lock_blocks(&self) -> Result<MutexGuard<'_, Vec<TimeBlock>>, InfraError> {
        self.blocks
            .lock()
            .map_err(|error| InfraError::LockPoisoned(format!("schedule lock poisoned: {error}")))
    }
}

impl<K: KeyValueStore> BlockSource for ScheduleService<K> {
    fn snapshot(&self) -> Result<Vec<TimeBlock>, InfraError> {
        self.blocks()
    }
}
