use crate::domain::models::TimeBlock;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::kv_store::KeyValueStore;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const TIME_BLOCKS_KEY: &str = "lifeos.time_blocks";

struct SampleSpec {
    id: &'static str,
    label: &'static str,
    category: &'static str,
    start: (u32, u32),
    end: (u32, u32),
}

const SAMPLE_SPECS: [SampleSpec; 2] = [
    SampleSpec {
        id: "sample-deep-work",
        label: "Deep work",
        category: "focus",
        start: (9, 0),
        end: (10, 30),
    },
    SampleSpec {
        id: "sample-review",
        label: "Review & planning",
        category: "admin",
        start: (14, 0),
        end: (14, 45),
    },
];

/// Illustrative blocks on the local day of `now`, written on first run so the
/// schedule is never blank.
pub fn sample_blocks(now: DateTime<Utc>, tz: Tz) -> Vec<TimeBlock> {
    let today = now.with_timezone(&tz).date_naive();
    SAMPLE_SPECS
        .iter()
        .filter_map(|spec| {
            Some(TimeBlock {
                id: spec.id.to_string(),
                start: local_instant(today, spec.start, tz)?,
                end: local_instant(today, spec.end, tz)?,
                label: spec.label.to_string(),
                category: spec.category.to_string(),
                completed: false,
            })
        })
        .collect()
}

fn local_instant(day: NaiveDate, (hour, minute): (u32, u32), tz: Tz) -> Option<DateTime<Utc>> {
    let naive = day.and_hms_opt(hour, minute, 0)?;
    let instant = tz
        .from_local_datetime(&naive)
        .earliest()
        .map(|value| value.with_timezone(&Utc))
        // Wall-clock times skipped by a DST jump fall back to UTC.
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive));
    Some(instant)
}

pub struct TimeBlockStore<K: KeyValueStore> {
    kv: Arc<K>,
    key: String,
    seed: Vec<TimeBlock>,
    damaged: AtomicBool,
}

impl<K: KeyValueStore> TimeBlockStore<K> {
    pub fn new(kv: Arc<K>, seed: Vec<TimeBlock>) -> Self {
        Self {
            kv,
            key: TIME_BLOCKS_KEY.to_string(),
            seed,
            damaged: AtomicBool::new(false),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn seed(&self) -> &[TimeBlock] {
        &self.seed
    }

    /// True after a failed read until the slot has been moved aside by `save`.
    pub fn is_damaged(&self) -> bool {
        self.damaged.load(Ordering::Relaxed)
    }

    /// Returns the persisted blocks, seeding the slot on first run.
    ///
    /// A failed read or decode is reported as an error and marks the slot
    /// damaged; the payload is left untouched.
    pub fn try_load(&self) -> Result<Vec<TimeBlock>, InfraError> {
        match self.kv.get_json::<Vec<TimeBlock>>(&self.key) {
            Ok(Some(blocks)) => {
                self.damaged.store(false, Ordering::Relaxed);
                info!(
                    "event=time_blocks_loaded module=store status=ok key={} count={}",
                    self.key,
                    blocks.len()
                );
                Ok(blocks)
            }
            Ok(None) => {
                self.damaged.store(false, Ordering::Relaxed);
                info!(
                    "event=time_blocks_seeded module=store status=ok key={} count={}",
                    self.key,
                    self.seed.len()
                );
                self.save(&self.seed);
                Ok(self.seed.clone())
            }
            Err(error) => {
                self.damaged.store(true, Ordering::Relaxed);
                warn!(
                    "event=time_blocks_load_failed module=store status=error key={} error={}",
                    self.key, error
                );
                Err(error)
            }
        }
    }

    /// Like [`try_load`](Self::try_load), answering a failed read with the seed set.
    pub fn load(&self) -> Vec<TimeBlock> {
        self.try_load().unwrap_or_else(|_| self.seed.clone())
    }

    /// Overwrites the whole collection. Returns whether the write reached the medium.
    ///
    /// A damaged slot is first copied to `<key>.corrupt-<millis>`; if that copy
    /// cannot be made the write is refused so the payload is never lost.
    pub fn save(&self, blocks: &[TimeBlock]) -> bool {
        if self.is_damaged() && !self.back_up_damaged_slot() {
            return false;
        }
        match self.kv.set_json(&self.key, blocks) {
            Ok(()) => true,
            Err(error) => {
                error!(
                    "event=time_blocks_save_failed module=store status=error key={} count={} error={}",
                    self.key,
                    blocks.len(),
                    error
                );
                false
            }
        }
    }

    fn back_up_damaged_slot(&self) -> bool {
        let backup_key = format!("{}.corrupt-{}", self.key, Utc::now().timestamp_millis());
        let result = self.kv.get_raw(&self.key).and_then(|raw| match raw {
            Some(raw) => self.kv.set_raw(&backup_key, &raw),
            None => Ok(()),
        });
        match result {
            Ok(()) => {
                self.damaged.store(false, Ordering::Relaxed);
                warn!(
                    "event=time_blocks_backed_up module=store status=ok key={} backup_key={}",
                    self.key, backup_key
                );
                true
            }
            Err(error) => {
                error!(
                    "event=time_blocks_save_refused module=store status=error key={} error={}",
                    self.key, error
                );
                false
            }
        }
    }
}
