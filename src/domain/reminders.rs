use crate::domain::models::Task;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// A reminder is only worth scheduling for unfinished tasks that have both a
/// start time and a lead time.
pub fn needs_reminder(task: &Task) -> bool {
    !task.completed && task.start.is_some() && task.reminder_minutes.is_some()
}

/// Instant the reminder should fire: the task's local start minus its lead time.
/// Returns `None` when no reminder is needed or the local start does not exist
/// in `zone` (skipped by a daylight-saving jump).
pub fn reminder_fire_time<Z: TimeZone>(task: &Task, zone: &Z) -> Option<DateTime<Utc>> {
    if !needs_reminder(task) {
        return None;
    }
    let start = task.date.and_time(task.start?);
    let lead = Duration::minutes(i64::from(task.reminder_minutes?));
    let local_start = zone.from_local_datetime(&start).earliest()?;
    Some(local_start.with_timezone(&Utc) - lead)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TaskDraft;
    use chrono::{NaiveDate, NaiveTime};
    use chrono_tz::Tz;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn timed_task(reminder_minutes: Option<u32>) -> Task {
        Task::new(
            TaskDraft {
                start: NaiveTime::from_hms_opt(9, 0, 0),
                reminder_minutes,
                ..TaskDraft::new(
                    "dentist",
                    NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date"),
                )
            },
            fixed_time("2026-02-10T08:00:00Z"),
        )
    }

    #[test]
    fn reminder_needs_time_lead_and_open_task() {
        assert!(needs_reminder(&timed_task(Some(10))));
        assert!(!needs_reminder(&timed_task(None)));

        let mut untimed = timed_task(Some(10));
        untimed.start = None;
        assert!(!needs_reminder(&untimed));

        let mut done = timed_task(Some(10));
        done.completed = true;
        assert!(!needs_reminder(&done));
    }

    #[test]
    fn fire_time_subtracts_lead_in_local_zone() {
        let task = timed_task(Some(15));
        assert_eq!(
            reminder_fire_time(&task, &Utc),
            Some(fixed_time("2026-02-16T08:45:00Z"))
        );

        let berlin: Tz = "Europe/Berlin".parse().expect("known zone");
        assert_eq!(
            reminder_fire_time(&task, &berlin),
            Some(fixed_time("2026-02-16T07:45:00Z"))
        );
    }

    #[test]
    fn no_fire_time_without_reminder() {
        assert_eq!(reminder_fire_time(&timed_task(None), &Utc), None);
    }
}
