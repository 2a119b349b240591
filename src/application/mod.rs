pub mod bootstrap;
pub mod reminder_poller;
pub mod schedule;
