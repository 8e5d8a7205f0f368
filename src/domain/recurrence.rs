use crate::domain::models::{next_id, Recurrence, Task};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};

/// Builds the next occurrence of a recurring task, or `None` when the task does
/// not recur. The source task is left untouched; the caller stores the result
/// as a new, independent record.
pub fn next_occurrence(task: &Task, now: DateTime<Utc>) -> Option<Task> {
    let anchor = task.recurrence_anchor.unwrap_or(task.date);
    let date = advance_date(task.recurrence, task.date, anchor)?;

    Some(Task {
        id: next_id("tsk"),
        date,
        completed: false,
        completed_at: None,
        recurrence_anchor: Some(anchor),
        created_at: now,
        updated_at: now,
        ..task.clone()
    })
}

/// Advances `date` by one period. Calendar-month periods are measured from the
/// series anchor so short months clamp a single occurrence without shifting
/// the ones after it.
pub fn advance_date(recurrence: Recurrence, date: NaiveDate, anchor: NaiveDate) -> Option<NaiveDate> {
    match recurrence {
        Recurrence::None => None,
        Recurrence::Daily => date.checked_add_signed(Duration::days(1)),
        Recurrence::Weekly => date.checked_add_signed(Duration::days(7)),
        Recurrence::Monthly => match months_between(anchor, date) {
            Some(elapsed) => anchor.checked_add_months(Months::new(elapsed.checked_add(1)?)),
            None => date.checked_add_months(Months::new(1)),
        },
        Recurrence::Yearly => match months_between(anchor, date) {
            Some(elapsed) => {
                let years = elapsed / 12 + 1;
                anchor.checked_add_months(Months::new(years.checked_mul(12)?))
            }
            None => date.checked_add_months(Months::new(12)),
        },
    }
}

fn months_between(anchor: NaiveDate, date: NaiveDate) -> Option<u32> {
    let months = (date.year() - anchor.year()) * 12 + date.month() as i32 - anchor.month() as i32;
    u32::try_from(months).ok()
}
