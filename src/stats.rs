//! Task overlap filtering and completion statistics

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::{Task, TaskStatus};

/// Tasks touching `[range_start, range_end]`, bounds inclusive.
///
/// A task qualifies when its start or its end lies inside the range, or when
/// it spans the whole range. A task ending exactly at `range_start` is
/// included. Input order is preserved.
pub fn tasks_overlapping<'a, I>(
    tasks: I,
    range_start: NaiveDateTime,
    range_end: NaiveDateTime,
) -> Vec<Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks
        .into_iter()
        .filter(|t| overlaps(t, range_start, range_end))
        .cloned()
        .collect()
}

pub fn overlaps(task: &Task, range_start: NaiveDateTime, range_end: NaiveDateTime) -> bool {
    let starts_inside = task.start >= range_start && task.start <= range_end;
    let ends_inside = task.end >= range_start && task.end <= range_end;
    let spans = task.start <= range_start && task.end >= range_end;
    starts_inside || ends_inside || spans
}

/// Denominator used for the completion rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RateBasis {
    /// `completed / total`, used by plain weekly and monthly statistics
    AllTasks,
    /// `completed / (total - canceled)`, used by the report task list
    ExcludingCanceled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatistics {
    pub total: usize,
    pub completed: usize,
    pub canceled: usize,
    pub planned: usize,
    /// Percentage in `0.0..=100.0`
    pub completion_rate: f64,
    pub rate_basis: RateBasis,
}

impl TaskStatistics {
    pub fn aggregate<'a, I>(tasks: I, basis: RateBasis) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut stats = TaskStatistics {
            total: 0,
            completed: 0,
            canceled: 0,
            planned: 0,
            completion_rate: 0.0,
            rate_basis: basis,
        };

        for task in tasks {
            stats.total += 1;
            match task.status {
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Canceled => stats.canceled += 1,
                TaskStatus::Plan => stats.planned += 1,
                TaskStatus::Unknown => {}
            }
        }

        let denominator = match basis {
            RateBasis::AllTasks => stats.total,
            RateBasis::ExcludingCanceled => stats.total - stats.canceled,
        };
        if denominator > 0 {
            stats.completion_rate = stats.completed as f64 / denominator as f64 * 100.0;
        }

        stats
    }

    /// Rate rounded to one decimal, as shown in reports
    pub fn rate_display(&self) -> String {
        format!("{:.1}%", self.completion_rate)
    }
}
