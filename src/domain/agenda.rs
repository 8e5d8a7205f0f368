use crate::domain::models::Task;
use chrono::{NaiveTime, Timelike};
use serde::Serialize;
use std::cmp::{Ordering, Reverse};

/// Shortest span a timed task occupies on the agenda.
pub const MIN_TASK_MINUTES: u32 = 5;

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgendaItem {
    TaskEntry(Task),
    FreeSlot {
        start: NaiveTime,
        end: NaiveTime,
        duration_minutes: u32,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayAgenda {
    pub items: Vec<AgendaItem>,
    pub untimed: Vec<Task>,
}

impl DayAgenda {
    pub fn free_minutes(&self) -> u32 {
        self.items
            .iter()
            .map(|item| match item {
                AgendaItem::FreeSlot {
                    duration_minutes, ..
                } => *duration_minutes,
                AgendaItem::TaskEntry(_) => 0,
            })
            .sum()
    }
}

#[derive(Debug)]
struct TimedTask {
    start: u32,
    end: u32,
    task: Task,
}

/// Lays out one day's tasks against the working window.
///
/// Timed tasks (those with a start) are emitted in start order with free slots
/// filling the gaps of the working window between them. Untimed tasks are
/// returned separately, unfinished and high-priority work first.
pub fn build_agenda(
    day_tasks: Vec<Task>,
    working_start: NaiveTime,
    working_end: NaiveTime,
) -> DayAgenda {
    let window_start = minute_of_day(working_start);
    let window_end = minute_of_day(working_end);

    let (mut timed, mut untimed): (Vec<_>, Vec<_>) = (Vec::new(), Vec::new());
    for task in day_tasks {
        match task.start {
            Some(start) => {
                let start = minute_of_day(start);
                let duration = task
                    .end
                    .map(|end| minute_of_day(end).saturating_sub(start))
                    .unwrap_or(0)
                    .max(MIN_TASK_MINUTES);
                timed.push(TimedTask {
                    start,
                    end: (start + duration).min(MINUTES_PER_DAY),
                    task,
                });
            }
            None => untimed.push(task),
        }
    }

    timed.sort_by(|left, right| {
        left.start
            .cmp(&right.start)
            .then(left.end.cmp(&right.end))
            .then_with(|| left.task.id.cmp(&right.task.id))
    });
    untimed.sort_by(untimed_order);

    if timed.is_empty() {
        let items = free_slot(window_start, window_end).into_iter().collect();
        return DayAgenda { items, untimed };
    }

    let mut items = Vec::with_capacity(timed.len() * 2 + 1);
    let mut cursor = window_start;
    for entry in timed {
        if entry.start > cursor {
            items.extend(free_slot(cursor, entry.start.min(window_end)));
        }
        cursor = cursor.max(entry.end);
        items.push(AgendaItem::TaskEntry(entry.task));
    }
    if cursor < window_end {
        items.extend(free_slot(cursor, window_end));
    }

    DayAgenda { items, untimed }
}

fn untimed_order(left: &Task, right: &Task) -> Ordering {
    left.completed
        .cmp(&right.completed)
        .then_with(|| Reverse(left.priority.weight()).cmp(&Reverse(right.priority.weight())))
        .then_with(|| left.title.cmp(&right.title))
}

fn free_slot(start: u32, end: u32) -> Option<AgendaItem> {
    if end <= start {
        return None;
    }
    Some(AgendaItem::FreeSlot {
        start: time_of_minute(start)?,
        end: time_of_minute(end)?,
        duration_minutes: end - start,
    })
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn time_of_minute(minute: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minute / 60, minute % 60, 0)
}
