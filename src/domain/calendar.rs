use crate::domain::models::Task;
use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;

/// Inclusive range of calendar days backing a week or month view.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DateRange {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.first <= date && date <= self.last
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.first.iter_days().take_while(|day| *day <= self.last)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayLoad {
    pub date: NaiveDate,
    pub total: u32,
    pub completed: u32,
}

pub fn week_bounds(date: NaiveDate, week_start: Weekday) -> DateRange {
    let offset =
        (7 + date.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;
    let first = date - Duration::days(i64::from(offset));
    DateRange {
        first,
        last: first + Duration::days(6),
    }
}

pub fn month_bounds(date: NaiveDate) -> Option<DateRange> {
    let first = date.with_day(1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some(DateRange { first, last })
}

/// Per-day task counts over `range`, including days without tasks.
pub fn day_loads(tasks: &[Task], range: DateRange) -> Vec<DayLoad> {
    let mut loads = range
        .days()
        .map(|date| (date, (0u32, 0u32)))
        .collect::<BTreeMap<_, _>>();
    for task in tasks.iter().filter(|task| range.contains(task.date)) {
        if let Some((total, completed)) = loads.get_mut(&task.date) {
            *total += 1;
            if task.completed {
                *completed += 1;
            }
        }
    }
    loads
        .into_iter()
        .map(|(date, (total, completed))| DayLoad {
            date,
            total,
            completed,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TaskDraft;
    use chrono::{DateTime, Utc};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-02-16T08:00:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    #[test]
    fn week_bounds_respect_week_start() {
        // 2026-02-18 is a Wednesday.
        let monday_week = week_bounds(date(2026, 2, 18), Weekday::Mon);
        assert_eq!(monday_week.first, date(2026, 2, 16));
        assert_eq!(monday_week.last, date(2026, 2, 22));

        let sunday_week = week_bounds(date(2026, 2, 18), Weekday::Sun);
        assert_eq!(sunday_week.first, date(2026, 2, 15));
        assert_eq!(sunday_week.last, date(2026, 2, 21));

        let on_start = week_bounds(date(2026, 2, 15), Weekday::Sun);
        assert_eq!(on_start.first, date(2026, 2, 15));
    }

    #[test]
    fn month_bounds_handle_leap_february() {
        let range = month_bounds(date(2024, 2, 10)).expect("in range");
        assert_eq!(range.first, date(2024, 2, 1));
        assert_eq!(range.last, date(2024, 2, 29));
        assert_eq!(range.days().count(), 29);

        let december = month_bounds(date(2025, 12, 31)).expect("in range");
        assert_eq!(december.last, date(2025, 12, 31));
    }

    #[test]
    fn day_loads_count_every_day_in_range() {
        let week = week_bounds(date(2026, 2, 18), Weekday::Mon);
        let mut done = Task::new(TaskDraft::new("done", date(2026, 2, 16)), fixed_now());
        done.completed = true;
        let open = Task::new(TaskDraft::new("open", date(2026, 2, 16)), fixed_now());
        let outside = Task::new(TaskDraft::new("outside", date(2026, 3, 1)), fixed_now());

        let loads = day_loads(&[done, open, outside], week);
        assert_eq!(loads.len(), 7);
        assert_eq!(
            loads[0],
            DayLoad {
                date: date(2026, 2, 16),
                total: 2,
                completed: 1
            }
        );
        assert!(loads[1..].iter().all(|load| load.total == 0));
    }
}
