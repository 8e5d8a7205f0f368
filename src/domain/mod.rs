pub mod agenda;
pub mod calendar;
pub mod hierarchy;
pub mod models;
pub mod recurrence;
pub mod reminders;
pub mod statistics;
pub mod validation;
