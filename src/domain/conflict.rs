use crate::domain::models::{Interval, TimeBlock};

/// Returns the first existing block whose `[start, end)` range overlaps `candidate`.
pub fn find_conflict<'a>(candidate: &Interval, existing: &'a [TimeBlock]) -> Option<&'a TimeBlock> {
    existing
        .iter()
        .find(|block| candidate.overlaps(&block.interval()))
}

pub fn conflicts(candidate: &Interval, existing: &[TimeBlock]) -> bool {
    find_conflict(candidate, existing).is_some()
}
