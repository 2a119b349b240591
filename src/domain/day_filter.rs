use crate::domain::models::TimeBlock;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Blocks whose start falls on `day` in `tz`, in source order.
pub fn blocks_on_day(blocks: &[TimeBlock], day: NaiveDate, tz: Tz) -> Vec<TimeBlock> {
    blocks
        .iter()
        .filter(|block| block.start.with_timezone(&tz).date_naive() == day)
        .cloned()
        .collect()
}

pub fn todays_blocks(blocks: &[TimeBlock], now: DateTime<Utc>, tz: Tz) -> Vec<TimeBlock> {
    blocks_on_day(blocks, now.with_timezone(&tz).date_naive(), tz)
}
