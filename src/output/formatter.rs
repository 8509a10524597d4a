use serde_json::Value as JsonValue;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::OutputFormat;
use crate::error::{Error, Result};
use crate::reports::{Report, Severity, Table};

/// Columns never shrink below this when truncating
const MIN_COLUMN_WIDTH: usize = 6;

/// Formats rendered pages for display
pub struct ReportFormatter {
    format: OutputFormat,
    max_column_width: usize,
}

impl ReportFormatter {
    pub fn new(format: OutputFormat, max_column_width: usize) -> Self {
        Self {
            format,
            max_column_width: max_column_width.max(MIN_COLUMN_WIDTH),
        }
    }

    pub fn format_report(&self, report: &Report) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(self.format_text(report)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Csv => self.format_csv(report),
        }
    }

    /// Format a standalone table, e.g. the page listing.
    pub fn format_table(&self, table: &Table) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(self.boxed_table(table)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(table)?),
            OutputFormat::Csv => self.format_csv_tables(&[table]),
        }
    }

    fn format_text(&self, report: &Report) -> String {
        let mut output = String::new();
        output.push_str(&format!("{} ({})\n", report.title, report.range));
        output.push_str(&"=".repeat(report.title.width() + report.range.to_string().width() + 3));
        output.push('\n');

        for notice in &report.notices {
            output.push_str(&format!("! {}\n", notice));
        }
        if !report.notices.is_empty() {
            output.push('\n');
        }

        if !report.metrics.is_empty() {
            let label_width = report
                .metrics
                .iter()
                .map(|m| m.label.width())
                .max()
                .unwrap_or(0);
            for metric in &report.metrics {
                output.push_str(&pad(&metric.label, label_width));
                output.push_str("  ");
                output.push_str(&metric.value);
                output.push('\n');
            }
            output.push('\n');
        }

        for finding in &report.findings {
            output.push_str(&format!("[{}] {}\n", severity_label(finding.severity), finding.message));
        }
        if !report.findings.is_empty() {
            output.push('\n');
        }

        for table in &report.tables {
            output.push_str(&table.title);
            output.push('\n');
            output.push_str(&self.boxed_table(table));
            output.push('\n');
        }

        for chart in &report.charts {
            output.push_str(&format!(
                "chart: {} ({:?} of {} by {} from '{}')\n",
                chart.title,
                chart.kind,
                chart.y.join(", "),
                chart.x,
                chart.table
            ));
        }

        output
    }

    fn boxed_table(&self, table: &Table) -> String {
        let string_rows: Vec<Vec<String>> = table
            .rows
            .iter()
            .map(|row| row.iter().map(format_json_value).collect())
            .collect();

        let mut col_widths: Vec<usize> = table.columns.iter().map(|c| c.width()).collect();
        for row in &string_rows {
            for (i, value) in row.iter().enumerate() {
                if let Some(width) = col_widths.get_mut(i) {
                    *width = (*width).max(value.width());
                }
            }
        }
        for width in col_widths.iter_mut() {
            *width = (*width).min(self.max_column_width);
        }

        if col_widths.is_empty() {
            return "(no columns)\n".to_string();
        }

        let mut output = String::new();
        output.push_str(&border(&col_widths, '┌', '┬', '┐'));
        output.push_str(&line(&table.columns, &col_widths));
        output.push_str(&border(&col_widths, '├', '┼', '┤'));
        for row in &string_rows {
            output.push_str(&line(row, &col_widths));
        }
        output.push_str(&border(&col_widths, '└', '┴', '┘'));

        let row_label = if string_rows.len() == 1 { "row" } else { "rows" };
        output.push_str(&format!("({} {})\n", string_rows.len(), row_label));
        output
    }

    fn format_csv(&self, report: &Report) -> Result<String> {
        let mut metrics = Table::new("metrics", &["label", "value"]);
        for metric in &report.metrics {
            metrics.push_row(vec![
                JsonValue::String(metric.label.clone()),
                JsonValue::String(metric.value.clone()),
            ]);
        }

        let mut tables = vec![&metrics];
        tables.extend(report.tables.iter());
        self.format_csv_tables(&tables)
    }

    /// Each table becomes a title record, a header record and its rows,
    /// separated by an empty line.
    fn format_csv_tables(&self, tables: &[&Table]) -> Result<String> {
        let mut output = String::new();
        for (index, table) in tables.iter().enumerate() {
            if index > 0 {
                output.push('\n');
            }

            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_writer(Vec::new());
            writer.write_record([table.title.as_str()])?;
            writer.write_record(&table.columns)?;
            for row in &table.rows {
                writer.write_record(row.iter().map(format_csv_value))?;
            }

            let bytes = writer
                .into_inner()
                .map_err(|e| Error::validation(format!("Failed to flush CSV output: {}", e)))?;
            output.push_str(&String::from_utf8_lossy(&bytes));
        }
        Ok(output)
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "INFO",
        Severity::Success => "OK",
        Severity::Warning => "WARNING",
        Severity::Critical => "CRITICAL",
    }
}

fn border(widths: &[usize], left: char, middle: char, right: char) -> String {
    let mut output = String::new();
    output.push(left);
    for (idx, width) in widths.iter().enumerate() {
        output.push_str(&"─".repeat(width + 2));
        output.push(if idx == widths.len() - 1 { right } else { middle });
    }
    output.push('\n');
    output
}

fn line(values: &[String], widths: &[usize]) -> String {
    let mut output = String::from("│");
    for (i, width) in widths.iter().enumerate() {
        let value = values.get(i).map(String::as_str).unwrap_or("");
        output.push(' ');
        output.push_str(&pad(&truncate_value(value, *width), *width));
        output.push_str(" │");
    }
    output.push('\n');
    output
}

/// Left-align `value` in `width` display columns.
fn pad(value: &str, width: usize) -> String {
    let padding = width.saturating_sub(value.width());
    format!("{}{}", value, " ".repeat(padding))
}

/// Truncate to `max_width` display columns, ending with an ellipsis.
fn truncate_value(value: &str, max_width: usize) -> String {
    if value.width() <= max_width {
        return value.to_string();
    }

    let (budget, suffix) = if max_width <= 3 {
        (max_width, "")
    } else {
        (max_width - 3, "...")
    };

    let mut used = 0;
    let mut output = String::new();
    for ch in value.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > budget {
            break;
        }
        used += ch_width;
        output.push(ch);
    }
    output.push_str(suffix);
    output
}

fn format_json_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.replace('\n', " "),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}

fn format_csv_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => format_json_value(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::{AdminPage, Page};
    use crate::storage::fixture::march_range;

    fn sample_report() -> Report {
        let mut report = Report::new(Page::Admin(AdminPage::Home), march_range());
        report.metric("Total Credits", "8.00");
        report.finding(Severity::Warning, "WH_A is expensive");
        report.notice("AI function usage is not available in this account; shown as 0.");

        let mut table = Table::new("Warehouses", &["warehouse_name", "credits"]);
        table.push_row(vec![JsonValue::from("WH_A"), JsonValue::from(3.5)]);
        table.push_row(vec![JsonValue::from("WH, \"B\""), JsonValue::Null]);
        report.push_table(table);
        report
    }

    #[test]
    fn test_truncate_value() {
        assert_eq!(truncate_value("short", 10), "short");
        assert_eq!(
            truncate_value("this is a very long string that needs truncation", 20),
            "this is a very lo..."
        );
        assert_eq!(truncate_value("test", 3), "tes");
        assert_eq!(truncate_value("hello", 4), "h...");
        // wide characters count double
        assert_eq!(truncate_value("倉庫倉庫倉庫", 7), "倉庫...");
    }

    #[test]
    fn test_text_output() {
        let formatter = ReportFormatter::new(OutputFormat::Text, 32);
        let text = formatter.format_report(&sample_report()).unwrap();

        assert!(text.starts_with("Account Cost Summary (2024-03-01 to 2024-03-07)"));
        assert!(text.contains("Total Credits  8.00"));
        assert!(text.contains("[WARNING] WH_A is expensive"));
        assert!(text.contains("! AI function usage"));
        assert!(text.contains("│ WH_A           │ 3.5     │"));
        assert!(text.contains("(2 rows)"));
    }

    #[test]
    fn test_json_output_round_trips_through_serde() {
        let formatter = ReportFormatter::new(OutputFormat::Json, 32);
        let json = formatter.format_report(&sample_report()).unwrap();
        let value: JsonValue = serde_json::from_str(&json).unwrap();

        assert_eq!(value["page"], "admin/home");
        assert_eq!(value["tables"][0]["rows"][0][1], 3.5);
    }

    #[test]
    fn test_csv_output_escapes() {
        let formatter = ReportFormatter::new(OutputFormat::Csv, 32);
        let csv = formatter.format_report(&sample_report()).unwrap();

        assert!(csv.starts_with("metrics\nlabel,value\nTotal Credits,8.00\n"));
        assert!(csv.contains("\nWarehouses\nwarehouse_name,credits\nWH_A,3.5\n\"WH, \"\"B\"\"\",\n"));
    }
}
