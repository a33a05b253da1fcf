//! Weekly report assembly
//!
//! A report covers one week, the month the week is filed under and the week
//! after it. All three are cut from a single task snapshot so the sections
//! agree with each other.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::calendar::{DateRange, MonthId, WeekId};
use crate::db::Database;
use crate::error::{PdcaError, Result};
use crate::models::{PlanPeriod, Task, UserProfile};
use crate::stats::{RateBasis, TaskStatistics, tasks_overlapping};

/// `M.D.` label with no leading zeros, e.g. `3.7.` for March 7
pub fn day_label(ts: &NaiveDateTime) -> String {
    format!("{}.{}.", ts.month(), ts.day())
}

/// Task with its display fields resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTask {
    pub task: Task,
    /// Calendar day of the start, `M.D.`
    pub display_date: String,
    /// `HH:MM`, absent for all-day tasks
    pub start_time: Option<String>,
    /// Duration in hours, absent for all-day tasks
    pub duration_hours: Option<f64>,
}

impl ReportTask {
    pub fn new(task: Task) -> Self {
        let display_date = day_label(&task.start);
        let (start_time, duration_hours) = if task.all_day {
            (None, None)
        } else {
            let minutes = (task.end - task.start).num_minutes();
            (
                Some(format!("{:02}:{:02}", task.start.hour(), task.start.minute())),
                Some(minutes as f64 / 60.0),
            )
        };

        Self {
            task,
            display_date,
            start_time,
            duration_hours,
        }
    }
}

/// Chronological, display-normalized copy of `tasks`
pub fn normalize(mut tasks: Vec<Task>) -> Vec<ReportTask> {
    tasks.sort_by_key(|t| t.start);
    tasks.into_iter().map(ReportTask::new).collect()
}

/// Everything the spreadsheet export needs for one weekly report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub owner: UserProfile,
    pub period_id: WeekId,
    pub period_range: DateRange,
    pub narrative_plan: Option<String>,
    /// Task-list statistics, canceled tasks excluded from the rate
    pub statistics: TaskStatistics,
    pub tasks: Vec<ReportTask>,
    pub monthly_period_id: MonthId,
    pub monthly_narrative_plan: Option<String>,
    pub monthly_statistics: TaskStatistics,
    pub next_period_id: WeekId,
    pub next_period_tasks: Vec<ReportTask>,
}

/// Plain statistics for one week
pub fn weekly_statistics(db: &Database, owner_id: i64, week: WeekId) -> Result<TaskStatistics> {
    let tasks = db.list_tasks(owner_id, Some(week.range().timestamp_bounds()))?;
    Ok(TaskStatistics::aggregate(&tasks, RateBasis::AllTasks))
}

/// Plain statistics for one month
pub fn monthly_statistics(db: &Database, owner_id: i64, month: MonthId) -> Result<TaskStatistics> {
    let tasks = db.list_tasks(owner_id, Some(month.range().timestamp_bounds()))?;
    Ok(TaskStatistics::aggregate(&tasks, RateBasis::AllTasks))
}

/// Build the weekly report. Any store failure aborts the whole report.
pub fn build_weekly_report(db: &Database, owner_id: i64, week: WeekId) -> Result<ReportData> {
    let owner = db
        .get_user(owner_id)?
        .ok_or_else(|| PdcaError::not_found(format!("User {owner_id}")))?;

    let month = week.month();
    let next = week.next();
    let week_range = week.range();
    let month_range = month.range();
    let next_range = next.range();

    let span = week_range.union(&month_range).union(&next_range);
    let snapshot = db.list_tasks(owner_id, Some(span.timestamp_bounds()))?;

    let slice = |range: &DateRange| {
        let (start, end) = range.timestamp_bounds();
        tasks_overlapping(&snapshot, start, end)
    };
    let week_tasks = slice(&week_range);
    let month_tasks = slice(&month_range);
    let next_tasks = slice(&next_range);

    tracing::debug!(
        owner_id,
        week = %week,
        month = %month,
        week_tasks = week_tasks.len(),
        month_tasks = month_tasks.len(),
        next_tasks = next_tasks.len(),
        "Report snapshot partitioned"
    );

    let narrative_plan = db
        .get_plan(owner_id, PlanPeriod::Week(week))?
        .map(|p| p.content);
    let monthly_narrative_plan = db
        .get_plan(owner_id, PlanPeriod::Month(month))?
        .map(|p| p.content);

    Ok(ReportData {
        owner,
        period_id: week,
        period_range: week_range,
        narrative_plan,
        statistics: TaskStatistics::aggregate(&week_tasks, RateBasis::ExcludingCanceled),
        tasks: normalize(week_tasks),
        monthly_period_id: month,
        monthly_narrative_plan,
        monthly_statistics: TaskStatistics::aggregate(&month_tasks, RateBasis::AllTasks),
        next_period_id: next,
        next_period_tasks: normalize(next_tasks),
    })
}
