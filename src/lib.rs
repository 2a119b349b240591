//! Time-block scheduling core for the LifeOS dashboard.
//!
//! Blocks are admitted through a half-open overlap check, persisted as one
//! JSON slot in a key-value store, projected into "today" by the configured
//! timezone, and reminded once per session by [`ReminderPoller`].

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{bootstrap_workspace, BootstrapResult};
pub use application::reminder_poller::{BlockSource, ReminderPoller};
pub use application::schedule::{NowProvider, ScheduleService};
pub use domain::conflict::{conflicts, find_conflict};
pub use domain::day_filter::{blocks_on_day, todays_blocks};
pub use domain::models::{
    Admission, Interval, Rejection, RejectionReason, Reminder, TimeBlock, TimeBlockDraft,
    DEFAULT_CATEGORY,
};
pub use domain::reminder::{ReminderState, ReminderTracker, DEFAULT_LEAD_TIME_MINUTES};
pub use infrastructure::config::ReminderSettings;
pub use infrastructure::error::InfraError;
pub use infrastructure::kv_store::{InMemoryKeyValueStore, KeyValueStore, SqliteKeyValueStore};
pub use infrastructure::logging::{default_log_level, init_logging, logging_status};
pub use infrastructure::notifier::{InMemoryNotifier, LogNotifier, Notifier};
pub use infrastructure::time_block_store::{sample_blocks, TimeBlockStore, TIME_BLOCKS_KEY};
