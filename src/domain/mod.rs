pub mod conflict;
pub mod day_filter;
pub mod models;
pub mod reminder;
