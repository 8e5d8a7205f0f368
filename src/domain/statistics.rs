use crate::domain::models::{Priority, Task};
use chrono::{Datelike, NaiveDate, TimeZone, Weekday};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

const HISTORY_DAYS: usize = 7;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeekdayCount {
    pub weekday: Weekday,
    pub completed: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriorityShare {
    pub priority: Priority,
    pub count: u32,
    pub fraction: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryShare {
    pub category: String,
    pub count: u32,
    pub fraction: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyCompletion {
    pub date: NaiveDate,
    pub completed: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Statistics {
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub completion_rate: f64,
    pub streak_days: u32,
    pub productivity_by_weekday: Vec<WeekdayCount>,
    pub priority_distribution: Vec<PriorityShare>,
    pub category_distribution: Vec<CategoryShare>,
    pub completion_history: Vec<DailyCompletion>,
}

/// Summarizes a task snapshot. `today` anchors the streak and `zone` decides
/// which calendar day a completion timestamp falls on.
pub fn aggregate<Tz: TimeZone>(all_tasks: &[Task], today: NaiveDate, zone: &Tz) -> Statistics {
    let total_tasks = all_tasks.len() as u32;
    let completed = all_tasks
        .iter()
        .filter(|task| task.completed)
        .collect::<Vec<_>>();
    let completed_tasks = completed.len() as u32;

    let completion_dates = completed
        .iter()
        .filter_map(|task| task.completed_at)
        .map(|completed_at| completed_at.with_timezone(zone).date_naive())
        .collect::<Vec<_>>();

    Statistics {
        total_tasks,
        completed_tasks,
        completion_rate: fraction(completed_tasks, total_tasks),
        streak_days: streak_days(&completion_dates, today),
        productivity_by_weekday: productivity_by_weekday(&completion_dates),
        priority_distribution: priority_distribution(all_tasks),
        category_distribution: category_distribution(all_tasks),
        completion_history: completion_history(&completion_dates),
    }
}

fn fraction(count: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(count) / f64::from(total)
}

fn streak_days(completion_dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let days = completion_dates.iter().copied().collect::<HashSet<_>>();
    let mut streak = 0;
    let mut cursor = Some(today);
    while let Some(day) = cursor.filter(|day| days.contains(day)) {
        streak += 1;
        cursor = day.pred_opt();
    }
    streak
}

fn productivity_by_weekday(completion_dates: &[NaiveDate]) -> Vec<WeekdayCount> {
    let mut counts = HashMap::<Weekday, u32>::new();
    for date in completion_dates {
        *counts.entry(date.weekday()).or_default() += 1;
    }
    WEEKDAYS
        .iter()
        .map(|weekday| WeekdayCount {
            weekday: *weekday,
            completed: counts.get(weekday).copied().unwrap_or(0),
        })
        .collect()
}

fn priority_distribution(all_tasks: &[Task]) -> Vec<PriorityShare> {
    let total = all_tasks.len() as u32;
    Priority::ALL
        .iter()
        .map(|priority| {
            let count = all_tasks
                .iter()
                .filter(|task| task.priority == *priority)
                .count() as u32;
            PriorityShare {
                priority: *priority,
                count,
                fraction: fraction(count, total),
            }
        })
        .collect()
}

fn category_distribution(all_tasks: &[Task]) -> Vec<CategoryShare> {
    let mut counts = BTreeMap::<&str, u32>::new();
    for category in all_tasks.iter().filter_map(Task::normalized_category) {
        *counts.entry(category).or_default() += 1;
    }
    let categorized = counts.values().sum::<u32>();

    let mut shares = counts
        .into_iter()
        .map(|(category, count)| CategoryShare {
            category: category.to_string(),
            count,
            fraction: fraction(count, categorized),
        })
        .collect::<Vec<_>>();
    // Ties keep the alphabetical order of the BTreeMap.
    shares.sort_by(|left, right| right.count.cmp(&left.count));
    shares
}

fn completion_history(completion_dates: &[NaiveDate]) -> Vec<DailyCompletion> {
    let mut counts = BTreeMap::<NaiveDate, u32>::new();
    for date in completion_dates {
        *counts.entry(*date).or_default() += 1;
    }
    counts
        .into_iter()
        .rev()
        .take(HISTORY_DAYS)
        .map(|(date, completed)| DailyCompletion { date, completed })
        .collect()
}
