//! Weekly report spreadsheet export
//!
//! Produces an xlsx workbook with up to three sheets:
//! - Plans & Statistics: monthly and weekly plan text with their statistics
//! - This Week: the week's tasks with PDCA notes, filterable
//! - Next Week: upcoming tasks, only when there are any

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use std::borrow::Cow;
use std::path::Path;

use crate::calendar::WeekId;
use crate::error::Result;
use crate::report::{ReportData, ReportTask};
use crate::stats::TaskStatistics;

const NO_MONTHLY_PLAN: &str = "No monthly plan registered.";
const NO_WEEKLY_PLAN: &str = "No weekly plan registered.";

const TASK_HEADERS: [(&str, f64); 9] = [
    ("Date", 10.0),
    ("Title", 30.0),
    ("Start", 10.0),
    ("Hours", 10.0),
    ("Location", 15.0),
    ("Status", 12.0),
    ("Do", 30.0),
    ("Check", 30.0),
    ("Act", 30.0),
];

/// Longest string a worksheet cell can hold
const MAX_CELL_CHARS: usize = 32_767;
const TRUNCATION_MARKER: &str = " [...]";

/// Columns shown on the next-week sheet (no PDCA notes yet)
const NEXT_WEEK_COLUMNS: usize = 6;

struct Formats {
    title: Format,
    section: Format,
    header: Format,
    cell: Format,
    text_block: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(16)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            section: Format::new()
                .set_bold()
                .set_font_size(12)
                .set_background_color(0xC5CAE9)
                .set_border(FormatBorder::Thin),
            header: Format::new()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_background_color(0x3F51B5)
                .set_font_color(0xFFFFFF)
                .set_border(FormatBorder::Thin),
            cell: Format::new()
                .set_border(FormatBorder::Thin)
                .set_align(FormatAlign::VerticalCenter),
            text_block: Format::new()
                .set_border(FormatBorder::Thin)
                .set_text_wrap()
                .set_align(FormatAlign::Top),
        }
    }
}

/// Cut `text` to fit in one cell, marking where it was cut
fn cell_text(text: &str) -> Cow<'_, str> {
    if text.chars().count() <= MAX_CELL_CHARS {
        return Cow::Borrowed(text);
    }
    let keep = MAX_CELL_CHARS - TRUNCATION_MARKER.chars().count();
    let end = text
        .char_indices()
        .nth(keep)
        .map_or(text.len(), |(idx, _)| idx);
    Cow::Owned(format!("{}{TRUNCATION_MARKER}", &text[..end]))
}

/// Default file name for a week's export
pub fn file_name(week: &WeekId) -> String {
    format!("PDCA_Report_{week}.xlsx")
}

/// Render the report to xlsx bytes
pub fn render_weekly_report(report: &ReportData) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let formats = Formats::new();

    add_plans_sheet(workbook.add_worksheet(), report, &formats)?;
    add_task_sheet(
        workbook.add_worksheet(),
        "This Week",
        &format!("This week: {}", report.period_id),
        &report.tasks,
        TASK_HEADERS.len(),
        &formats,
    )?;
    if !report.next_period_tasks.is_empty() {
        add_task_sheet(
            workbook.add_worksheet(),
            "Next Week",
            &format!("Next week: {}", report.next_period_id),
            &report.next_period_tasks,
            NEXT_WEEK_COLUMNS,
            &formats,
        )?;
    }

    let buffer = workbook.save_to_buffer()?;
    tracing::info!(
        week = %report.period_id,
        tasks = report.tasks.len(),
        bytes = buffer.len(),
        "Rendered weekly report"
    );
    Ok(buffer)
}

/// Render the report and write it to `path`, overwriting any existing file
pub fn write_weekly_report(report: &ReportData, path: &Path) -> Result<()> {
    let bytes = render_weekly_report(report)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

fn stats_row(
    sheet: &mut Worksheet,
    row: u32,
    stats: &TaskStatistics,
    rate_label: &str,
    formats: &Formats,
) -> Result<()> {
    let cells = [
        format!("Total: {}", stats.total),
        format!("Completed: {}", stats.completed),
        format!("Canceled: {}", stats.canceled),
        format!("Planned: {}", stats.planned),
        format!("{rate_label}: {}", stats.rate_display()),
    ];
    for (col, text) in cells.iter().enumerate() {
        sheet.write_string_with_format(row, col as u16, text, &formats.cell)?;
    }
    Ok(())
}

fn add_plans_sheet(sheet: &mut Worksheet, report: &ReportData, formats: &Formats) -> Result<()> {
    sheet.set_name("Plans & Statistics")?;
    for col in 0..5u16 {
        sheet.set_column_width(col, 24)?;
    }

    let range = report.period_range;
    sheet.merge_range(
        0,
        0,
        0,
        4,
        &format!(
            "PDCA Report: {} ({} - {})",
            report.period_id, range.start, range.end
        ),
        &formats.title,
    )?;
    sheet.set_row_height(0, 30)?;

    let sections = [
        (
            2u32,
            format!("Monthly plan ({})", report.monthly_period_id),
            report
                .monthly_narrative_plan
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(NO_MONTHLY_PLAN),
            &report.monthly_statistics,
            "Completion rate",
        ),
        (
            8u32,
            format!("Weekly plan ({})", report.period_id),
            report
                .narrative_plan
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(NO_WEEKLY_PLAN),
            &report.statistics,
            "Completion rate (excl. canceled)",
        ),
    ];

    for (row, heading, plan, stats, rate_label) in sections {
        sheet.merge_range(row, 0, row, 4, &heading, &formats.section)?;
        sheet.merge_range(row + 1, 0, row + 1, 4, &cell_text(plan), &formats.text_block)?;
        sheet.set_row_height(row + 1, 60)?;
        stats_row(sheet, row + 3, stats, rate_label, formats)?;
    }

    Ok(())
}

fn add_task_sheet(
    sheet: &mut Worksheet,
    name: &str,
    title: &str,
    tasks: &[ReportTask],
    columns: usize,
    formats: &Formats,
) -> Result<()> {
    sheet.set_name(name)?;
    let last_col = (columns - 1) as u16;

    sheet.merge_range(0, 0, 0, last_col, &cell_text(title), &formats.title)?;
    sheet.set_row_height(0, 30)?;

    let header_row = 2u32;
    for (col, (header, width)) in TASK_HEADERS.iter().take(columns).enumerate() {
        sheet.set_column_width(col as u16, *width)?;
        sheet.write_string_with_format(header_row, col as u16, *header, &formats.header)?;
    }
    sheet.autofilter(header_row, 0, header_row, last_col)?;

    for (i, rt) in tasks.iter().enumerate() {
        let row = header_row + 1 + i as u32;
        let task = &rt.task;
        let values = [
            rt.display_date.clone(),
            task.title.clone(),
            rt.start_time.clone().unwrap_or_else(|| "All day".to_string()),
            rt.duration_hours
                .map(|h| format!("{h:.1}"))
                .unwrap_or_else(|| "All day".to_string()),
            task.location.label().to_string(),
            task.status.label().to_string(),
            task.do_text.clone().unwrap_or_else(|| "-".to_string()),
            task.check_text.clone().unwrap_or_else(|| "-".to_string()),
            task.act_text.clone().unwrap_or_else(|| "-".to_string()),
        ];

        for (col, value) in values.iter().take(columns).enumerate() {
            let format = if col >= NEXT_WEEK_COLUMNS {
                &formats.text_block
            } else {
                &formats.cell
            };
            sheet.write_string_with_format(row, col as u16, &*cell_text(value), format)?;
        }
    }

    Ok(())
}
