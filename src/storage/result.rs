use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Materialized query result: ordered column names and rows of JSON cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build from borrowed column names, mostly for tests and fake engines.
    pub fn with_columns(columns: &[&str]) -> Self {
        Self::new(columns.iter().map(|c| c.to_string()).collect())
    }

    /// Append a row; short rows are padded with NULL, long rows truncated.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn rows(&self) -> impl Iterator<Item = UsageRow<'_>> {
        self.rows.iter().map(move |values| UsageRow {
            columns: &self.columns,
            values,
        })
    }

    pub fn first(&self) -> Option<UsageRow<'_>> {
        self.rows().next()
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Value>>) {
        (self.columns, self.rows)
    }
}

/// Borrowed view of one result row with typed, case-insensitive accessors.
///
/// Missing columns and NULL measures read as zero (or an empty string).
#[derive(Debug, Clone, Copy)]
pub struct UsageRow<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> UsageRow<'a> {
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|index| self.values.get(index))
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn decimal(&self, name: &str) -> Decimal {
        self.get(name).map(value_to_decimal).unwrap_or(Decimal::ZERO)
    }

    pub fn float(&self, name: &str) -> f64 {
        match self.get(name) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            Some(Value::Bool(b)) => f64::from(u8::from(*b)),
            _ => 0.0,
        }
    }

    pub fn int(&self, name: &str) -> i64 {
        match self.get(name) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            Some(Value::Bool(b)) => i64::from(*b),
            _ => 0,
        }
    }

    /// Non-negative count.
    pub fn count(&self, name: &str) -> u64 {
        self.int(name).max(0) as u64
    }

    pub fn text(&self, name: &str) -> String {
        self.opt_text(name).unwrap_or_default()
    }

    pub fn opt_text(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

pub(crate) fn value_to_decimal(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Decimal::from(i)
            } else if let Some(u) = n.as_u64() {
                Decimal::from(u)
            } else {
                n.as_f64()
                    .and_then(Decimal::from_f64)
                    .unwrap_or(Decimal::ZERO)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            s.parse::<Decimal>()
                .ok()
                .or_else(|| Decimal::from_scientific(s).ok())
                .unwrap_or(Decimal::ZERO)
        }
        Value::Bool(true) => Decimal::ONE,
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ResultSet {
        let mut rs = ResultSet::with_columns(&["WAREHOUSE_NAME", "total_credits", "query_count"]);
        rs.push_row(vec![json!("WH_A"), json!(12.5), json!(40)]);
        rs.push_row(vec![json!("WH_B"), Value::Null, json!("7")]);
        rs
    }

    #[test]
    fn test_accessors_are_case_insensitive() {
        let rs = sample();
        let row = rs.first().unwrap();
        assert_eq!(row.text("warehouse_name"), "WH_A");
        assert_eq!(row.decimal("TOTAL_CREDITS"), Decimal::new(125, 1));
        assert_eq!(row.count("Query_Count"), 40);
        assert_eq!(rs.column_index("query_COUNT"), Some(2));
    }

    #[test]
    fn test_null_and_missing_read_as_zero() {
        let rs = sample();
        let row = rs.rows().nth(1).unwrap();
        assert_eq!(row.decimal("total_credits"), Decimal::ZERO);
        assert_eq!(row.float("no_such_column"), 0.0);
        assert_eq!(row.int("query_count"), 7);
        assert_eq!(row.opt_text("total_credits"), None);
        assert_eq!(row.text("missing"), "");
    }

    #[test]
    fn test_push_row_normalizes_width() {
        let mut rs = ResultSet::with_columns(&["a", "b"]);
        rs.push_row(vec![json!(1)]);
        rs.push_row(vec![json!(1), json!(2), json!(3)]);
        let (_, rows) = rs.into_parts();
        assert_eq!(rows[0], vec![json!(1), Value::Null]);
        assert_eq!(rows[1].len(), 2);
    }

    #[test]
    fn test_decimal_from_strings() {
        assert_eq!(value_to_decimal(&json!("0.015")), Decimal::new(15, 3));
        assert_eq!(value_to_decimal(&json!("1e-2")), Decimal::new(1, 2));
        assert_eq!(value_to_decimal(&json!("n/a")), Decimal::ZERO);
    }
}
