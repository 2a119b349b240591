use crate::domain::models::{Reminder, TimeBlock};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

pub const DEFAULT_LEAD_TIME_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    NotYetDue,
    Reminded,
}

/// Session-scoped record of which blocks have already been reminded.
#[derive(Debug, Clone)]
pub struct ReminderTracker {
    lead_time_minutes: i64,
    reminded: HashSet<String>,
}

impl Default for ReminderTracker {
    fn default() -> Self {
        Self::new(DEFAULT_LEAD_TIME_MINUTES)
    }
}

impl ReminderTracker {
    pub fn new(lead_time_minutes: i64) -> Self {
        Self {
            lead_time_minutes: lead_time_minutes.max(0),
            reminded: HashSet::new(),
        }
    }

    pub fn lead_time_minutes(&self) -> i64 {
        self.lead_time_minutes
    }

    pub fn state_of(&self, block_id: &str) -> ReminderState {
        if self.reminded.contains(block_id) {
            ReminderState::Reminded
        } else {
            ReminderState::NotYetDue
        }
    }

    pub fn reminded_count(&self) -> usize {
        self.reminded.len()
    }

    /// Evaluates one tick and moves every due block to `Reminded`.
    ///
    /// A block is due when it is not completed and
    /// `0 <= floor((start - now) / 1 minute) <= lead_time_minutes`.
    pub fn collect_due(&mut self, blocks: &[TimeBlock], now: DateTime<Utc>) -> Vec<Reminder> {
        let mut due = Vec::new();
        for block in blocks {
            if block.completed || self.reminded.contains(&block.id) {
                continue;
            }

            let minutes_until_start = minutes_until(block.start, now);
            if !(0..=self.lead_time_minutes).contains(&minutes_until_start) {
                continue;
            }

            self.reminded.insert(block.id.clone());
            due.push(Reminder {
                block_id: block.id.clone(),
                label: block.label.clone(),
                start: block.start,
                minutes_until_start,
            });
        }
        due
    }
}

/// Whole minutes from `now` to `start`, floored (a start 1ns ago is -1).
fn minutes_until(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let delta = start - now;
    // num_minutes truncates toward zero.
    let minutes = delta.num_minutes();
    if delta < Duration::minutes(minutes) {
        minutes - 1
    } else {
        minutes
    }
}
