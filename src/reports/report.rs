use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Number, Value};

use crate::reports::Page;
use crate::rollup::DateRange;
use crate::storage::ResultSet;

/// Everything one page shows for one date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub page: String,
    pub title: String,
    pub range: DateRange,
    pub metrics: Vec<Metric>,
    pub tables: Vec<Table>,
    pub charts: Vec<ChartSpec>,
    pub findings: Vec<Finding>,
    /// Non-fatal degradations, e.g. an optional view that is not deployed.
    pub notices: Vec<String>,
}

impl Report {
    pub fn new(page: Page, range: DateRange) -> Self {
        Self {
            page: page.slug(),
            title: page.title().to_string(),
            range,
            metrics: Vec::new(),
            tables: Vec::new(),
            charts: Vec::new(),
            findings: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn metric(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.metrics.push(Metric {
            label: label.into(),
            value: value.into(),
        });
    }

    pub fn push_table(&mut self, table: Table) {
        self.tables.push(table);
    }

    pub fn chart(&mut self, chart: ChartSpec) {
        self.charts.push(chart);
    }

    pub fn finding(&mut self, severity: Severity, message: impl Into<String>) {
        self.findings.push(Finding {
            severity,
            message: message.into(),
        });
    }

    /// Record a degradation once, however many queries hit it.
    pub fn notice(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.notices.contains(&message) {
            self.notices.push(message);
        }
    }

    pub fn table(&self, title: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.title == title)
    }

    pub fn metric_value(&self, label: &str) -> Option<&str> {
        self.metrics
            .iter()
            .find(|m| m.label == label)
            .map(|m| m.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(title: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            title: title.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Take a query result as-is.
    pub fn from_result_set(title: impl Into<String>, result: ResultSet) -> Self {
        let (columns, rows) = result.into_parts();
        Self {
            title: title.into(),
            columns,
            rows,
        }
    }

    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, top to bottom.
    pub fn values(&self, name: &str) -> Vec<&Value> {
        match self.column(name) {
            Some(index) => self.rows.iter().filter_map(|r| r.get(index)).collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    StackedBar,
    Line,
    Pie,
    Scatter,
    Histogram,
}

/// What to plot; rendering is left to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    /// Title of the table holding the data.
    pub table: String,
    pub x: String,
    pub y: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, title: &str, table: &str, x: &str, y: &[&str]) -> Self {
        Self {
            kind,
            title: title.to_string(),
            table: table.to_string(),
            x: x.to_string(),
            y: y.iter().map(|c| c.to_string()).collect(),
            color: None,
            size: None,
        }
    }

    /// Pie slices named by `names`, sized by `values`.
    pub fn pie(title: &str, table: &str, names: &str, values: &str) -> Self {
        Self::new(ChartKind::Pie, title, table, names, &[values])
    }

    pub fn with_color(mut self, column: &str) -> Self {
        self.color = Some(column.to_string());
        self
    }

    pub fn with_size(mut self, column: &str) -> Self {
        self.size = Some(column.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

pub fn decimal_cell(value: Decimal, dp: u32) -> Value {
    value
        .round_dp(dp)
        .to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

pub fn float_cell(value: f64, dp: i32) -> Value {
    let factor = 10f64.powi(dp);
    Number::from_f64((value * factor).round() / factor)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

pub fn text_cell(value: impl Into<String>) -> Value {
    Value::String(value.into())
}

/// First `max_chars` characters, with an ellipsis when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// `1234.5` -> `"1,234.50"` style formatting for headline metrics.
pub fn format_credits(value: Decimal, dp: u32) -> String {
    let rounded = format!("{:.*}", dp as usize, value.round_dp(dp));
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };
    let (whole, fraction) = match digits.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

pub fn format_count(value: u64) -> String {
    format_credits(Decimal::from(value), 0)
}
