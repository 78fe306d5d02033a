use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Work,
    Personal,
    Urgent,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 3] = [
        TaskCategory::Work,
        TaskCategory::Personal,
        TaskCategory::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Work => "work",
            TaskCategory::Personal => "personal",
            TaskCategory::Urgent => "urgent",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskCategory {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "work" => Ok(TaskCategory::Work),
            "personal" => Ok(TaskCategory::Personal),
            "urgent" => Ok(TaskCategory::Urgent),
            other => Err(format!("unsupported task category: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "high",
            TaskPriority::Medium => "medium",
            TaskPriority::Low => "low",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskPriority {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "high" => Ok(TaskPriority::High),
            "medium" => Ok(TaskPriority::Medium),
            "low" => Ok(TaskPriority::Low),
            other => Err(format!("unsupported task priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskRecord {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

/// A task as owned by the task-management layer. Timestamps stay in their
/// persisted RFC 3339 form and are parsed when the engine validates the set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: TaskCategory,
    pub priority: TaskPriority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub estimated_minutes: Option<i64>,
    #[serde(default)]
    pub subtasks: Option<Vec<SubtaskRecord>>,
    #[serde(default)]
    pub blockers: Option<Vec<String>>,
}

impl TaskRecord {
    /// Fraction of subtasks still open, `1.0` when the task has none.
    pub fn remaining_fraction(&self) -> f64 {
        match self.subtasks.as_deref() {
            Some(subtasks) if !subtasks.is_empty() => {
                let open = subtasks.iter().filter(|subtask| !subtask.completed).count();
                open as f64 / subtasks.len() as f64
            }
            _ => 1.0,
        }
    }
}

/// Lookup of the current task set by id.
#[derive(Debug, Clone, Default)]
pub struct TaskIndex {
    by_id: HashMap<String, TaskRecord>,
}

impl TaskIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task: TaskRecord) {
        self.by_id.insert(task.id.clone(), task);
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskRecord> {
        self.by_id.get(task_id)
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.by_id.contains_key(task_id)
    }

    pub fn priority_of(&self, task_id: &str) -> Option<TaskPriority> {
        self.by_id.get(task_id).map(|task| task.priority)
    }

    pub fn is_completed(&self, task_id: &str) -> bool {
        self.by_id
            .get(task_id)
            .map(|task| task.completed)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl FromIterator<TaskRecord> for TaskIndex {
    fn from_iter<I: IntoIterator<Item = TaskRecord>>(iter: I) -> Self {
        let mut index = TaskIndex::new();
        for task in iter {
            index.insert(task);
        }
        index
    }
}
