use crate::domain::models::Task;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ActivityProgress {
    pub parent_id: String,
    pub completed_children: u32,
    pub total_children: u32,
}

/// Parent id -> children lookup over one task snapshot.
#[derive(Debug, Default)]
pub struct TaskHierarchy<'a> {
    children: HashMap<&'a str, Vec<&'a Task>>,
}

impl<'a> TaskHierarchy<'a> {
    pub fn from_snapshot(tasks: &'a [Task]) -> Self {
        let mut children = HashMap::<&str, Vec<&Task>>::new();
        for task in tasks {
            if let Some(parent_id) = task.parent_id.as_deref() {
                children.entry(parent_id).or_default().push(task);
            }
        }
        for siblings in children.values_mut() {
            siblings.sort_by(|left, right| {
                left.date
                    .cmp(&right.date)
                    .then(left.start.cmp(&right.start))
                    .then_with(|| left.title.cmp(&right.title))
            });
        }
        Self { children }
    }

    pub fn children_of(&self, parent_id: &str) -> &[&'a Task] {
        self.children
            .get(parent_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_children(&self, parent_id: &str) -> bool {
        !self.children_of(parent_id).is_empty()
    }

    pub fn progress(&self, parent_id: &str) -> ActivityProgress {
        let children = self.children_of(parent_id);
        ActivityProgress {
            parent_id: parent_id.to_string(),
            completed_children: children.iter().filter(|task| task.completed).count() as u32,
            total_children: children.len() as u32,
        }
    }
}
