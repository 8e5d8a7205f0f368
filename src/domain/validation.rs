use crate::domain::models::{latest_time_of_day, Task};
use chrono::NaiveTime;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),
    #[error("interval task requires an end")]
    MissingEndForInterval,
    #[error("interval overlaps task {conflicting_id} ({conflicting_title})")]
    OverlappingInterval {
        conflicting_id: String,
        conflicting_title: String,
    },
}

/// Checks a candidate task against the same-day tasks already stored.
///
/// Only interval tasks on the candidate's date take part in overlap detection,
/// and the candidate's own stored copy (same id) is ignored so updates do not
/// conflict with themselves.
pub fn validate(task: &Task, same_day_tasks: &[Task]) -> Result<(), ValidationError> {
    let latest = latest_time_of_day();

    if let Some(start) = task.start {
        if start > latest {
            return Err(ValidationError::InvalidTimeRange(format!(
                "start {} is after 23:59",
                start.format("%H:%M:%S")
            )));
        }
    }

    if let Some(end) = task.end {
        let Some(start) = task.start else {
            return Err(ValidationError::InvalidTimeRange(
                "end requires a start".to_string(),
            ));
        };
        if end <= start {
            return Err(ValidationError::InvalidTimeRange(format!(
                "end {} must be after start {}",
                end.format("%H:%M"),
                start.format("%H:%M")
            )));
        }
        if end > latest {
            return Err(ValidationError::InvalidTimeRange(format!(
                "end {} is after 23:59",
                end.format("%H:%M:%S")
            )));
        }
    }

    if !task.is_interval() {
        return Ok(());
    }

    let Some(end) = task.end else {
        return Err(ValidationError::MissingEndForInterval);
    };
    let Some(start) = task.start else {
        return Err(ValidationError::InvalidTimeRange(
            "interval task requires a start".to_string(),
        ));
    };

    let conflict = same_day_tasks
        .iter()
        .filter(|other| other.id != task.id && other.date == task.date && other.is_interval())
        .find(|other| match (other.start, other.end) {
            (Some(other_start), Some(other_end)) => {
                ranges_overlap(start, end, other_start, other_end)
            }
            _ => false,
        });

    match conflict {
        Some(other) => Err(ValidationError::OverlappingInterval {
            conflicting_id: other.id.clone(),
            conflicting_title: other.title.clone(),
        }),
        None => Ok(()),
    }
}

/// Half-open interval test: touching ranges (`a_end == b_start`) do not overlap.
pub fn ranges_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{TaskDraft, TaskKind};
    use chrono::{DateTime, NaiveDate, Utc};
    use proptest::prelude::*;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-02-16T08:00:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date")
    }

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
    }

    fn interval(title: &str, start: NaiveTime, end: NaiveTime) -> Task {
        let draft = TaskDraft {
            start: Some(start),
            end: Some(end),
            kind: TaskKind::Interval,
            ..TaskDraft::new(title, day())
        };
        Task::new(draft, fixed_now())
    }

    fn point(title: &str, start: NaiveTime) -> Task {
        let draft = TaskDraft {
            start: Some(start),
            ..TaskDraft::new(title, day())
        };
        Task::new(draft, fixed_now())
    }

    #[test]
    fn rejects_interval_without_end() {
        let mut task = interval("standup", time(9, 0), time(9, 15));
        task.end = None;
        assert_eq!(
            validate(&task, &[]),
            Err(ValidationError::MissingEndForInterval)
        );
    }

    #[test]
    fn rejects_end_not_after_start() {
        let task = interval("backwards", time(10, 0), time(10, 0));
        assert!(matches!(
            validate(&task, &[]),
            Err(ValidationError::InvalidTimeRange(_))
        ));
    }

    #[test]
    fn rejects_times_past_last_minute() {
        let task = point("late", NaiveTime::from_hms_opt(23, 59, 30).expect("valid time"));
        assert!(matches!(
            validate(&task, &[]),
            Err(ValidationError::InvalidTimeRange(_))
        ));
    }

    #[test]
    fn rejects_end_without_start() {
        let mut task = point("no start", time(9, 0));
        task.start = None;
        task.end = Some(time(10, 0));
        assert!(matches!(
            validate(&task, &[]),
            Err(ValidationError::InvalidTimeRange(_))
        ));
    }

    #[test]
    fn time_range_is_checked_before_missing_end() {
        let mut task = interval("both wrong", time(9, 0), time(8, 0));
        task.start = Some(NaiveTime::from_hms_opt(23, 59, 59).expect("valid time"));
        task.end = None;
        assert!(matches!(
            validate(&task, &[]),
            Err(ValidationError::InvalidTimeRange(_))
        ));
    }

    #[test]
    fn rejects_overlapping_intervals() {
        let existing = interval("meeting", time(10, 0), time(11, 0));
        let candidate = interval("review", time(10, 30), time(11, 30));
        match validate(&candidate, &[existing.clone()]) {
            Err(ValidationError::OverlappingInterval { conflicting_id, .. }) => {
                assert_eq!(conflicting_id, existing.id);
            }
            other => panic!("expected overlap error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_touching_intervals() {
        let existing = interval("meeting", time(10, 0), time(11, 0));
        let after = interval("review", time(11, 0), time(12, 0));
        let before = interval("prep", time(9, 0), time(10, 0));
        assert!(validate(&after, &[existing.clone()]).is_ok());
        assert!(validate(&before, &[existing]).is_ok());
    }

    #[test]
    fn point_tasks_never_conflict() {
        let existing = interval("meeting", time(10, 0), time(11, 0));
        let candidate = point("call", time(10, 30));
        assert!(validate(&candidate, &[existing.clone()]).is_ok());

        let blocking_point = point("reminder", time(10, 30));
        let candidate = interval("review", time(10, 0), time(11, 0));
        assert!(validate(&candidate, &[blocking_point]).is_ok());
    }

    #[test]
    fn ignores_own_stored_copy() {
        let stored = interval("meeting", time(10, 0), time(11, 0));
        let mut moved = stored.clone();
        moved.start = Some(time(10, 30));
        moved.end = Some(time(11, 30));
        assert!(validate(&moved, &[stored]).is_ok());
    }

    #[test]
    fn ignores_tasks_on_other_dates() {
        let mut other_day = interval("meeting", time(10, 0), time(11, 0));
        other_day.date = day().succ_opt().expect("next day");
        let candidate = interval("review", time(10, 0), time(11, 0));
        assert!(validate(&candidate, &[other_day]).is_ok());
    }

    fn minute_range() -> impl Strategy<Value = (u32, u32)> {
        (0u32..1438u32).prop_flat_map(|start| (Just(start), (start + 1)..1439u32))
    }

    fn from_minutes(minutes: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).expect("valid minute of day")
    }

    // Property: overlapping same-day intervals are always rejected, disjoint ones accepted
    proptest! {
        #[test]
        fn overlap_decision_matches_half_open_test(a in minute_range(), b in minute_range()) {
            let existing = interval("a", from_minutes(a.0), from_minutes(a.1));
            let candidate = interval("b", from_minutes(b.0), from_minutes(b.1));
            let overlapping = a.0 < b.1 && b.0 < a.1;
            let result = validate(&candidate, &[existing]);
            if overlapping {
                let is_overlap = matches!(result, Err(ValidationError::OverlappingInterval { .. }));
                prop_assert!(is_overlap);
            } else {
                prop_assert!(result.is_ok());
            }
        }

        #[test]
        fn interval_without_end_is_always_rejected(start in 0u32..1440u32) {
            let mut task = interval("a", from_minutes(start.min(1438)), from_minutes(1439));
            task.end = None;
            prop_assert_eq!(validate(&task, &[]), Err(ValidationError::MissingEndForInterval));
        }
    }
}
