/// Table content as persisted on disk: `{"columns": [...], "rows": [...]}`
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::{Row, Value};

/// Full content of one table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableData {
    /// Declared column names (ordered, fixed at creation)
    pub columns: Vec<String>,
    /// Rows in insertion order
    #[serde(default, deserialize_with = "deserialize_rows")]
    pub rows: Vec<Row>,
}

impl TableData {
    /// Create an empty table with the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First name in `names` that is not a declared column
    pub fn find_undeclared<'a, I>(&self, names: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a String>,
    {
        names
            .into_iter()
            .find(|name| !self.has_column(name))
            .map(String::as_str)
    }

    /// Whether the row's value for `column` equals `literal`
    ///
    /// A row that has no value for the column never matches.
    pub fn row_matches(row: &Row, column: &str, literal: &str) -> bool {
        row.get(column).map(|v| v == literal).unwrap_or(false)
    }

    /// Reduce every row to `columns`, keeping row order
    pub fn project(&self, columns: &[String]) -> Vec<Row> {
        self.rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                    .collect()
            })
            .collect()
    }
}

/// First column name that appears more than once
pub fn duplicate_column(columns: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    columns
        .iter()
        .find(|c| !seen.insert(c.as_str()))
        .map(String::as_str)
}

/// Accept non-string JSON cells written by other tools: numbers and booleans
/// are stringified, nulls are dropped from the row.
fn deserialize_rows<'de, D>(deserializer: D) -> Result<Vec<Row>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<BTreeMap<String, serde_json::Value>> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|row| {
            row.into_iter()
                .filter_map(|(column, cell)| {
                    let value: Option<Value> = match cell {
                        serde_json::Value::Null => None,
                        serde_json::Value::String(s) => Some(s),
                        other => Some(other.to_string()),
                    };
                    value.map(|v| (column, v))
                })
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableData {
        let mut table = TableData::new(vec!["id".into(), "name".into()]);
        table.rows.push(Row::from([("id".into(), "1".into()), ("name".into(), "Alice".into())]));
        table.rows.push(Row::from([("id".into(), "2".into()), ("name".into(), "Bob".into())]));
        table
    }

    #[test]
    fn test_find_undeclared() {
        let table = users();
        let cols = vec!["id".to_string(), "zzz".to_string()];
        assert_eq!(table.find_undeclared(&cols), Some("zzz"));
        assert_eq!(table.find_undeclared(&table.columns), None);
    }

    #[test]
    fn test_duplicate_column() {
        let cols: Vec<String> = vec!["a".into(), "b".into(), "a".into()];
        assert_eq!(duplicate_column(&cols), Some("a"));
        assert_eq!(duplicate_column(&cols[..2]), None);
    }

    #[test]
    fn test_project_keeps_row_order() {
        let rows = users().project(&["name".to_string()]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name").map(String::as_str), Some("Alice"));
        assert!(rows[0].get("id").is_none());
        assert_eq!(rows[1].get("name").map(String::as_str), Some("Bob"));
    }

    #[test]
    fn test_row_matches_is_string_equality() {
        let table = users();
        assert!(TableData::row_matches(&table.rows[0], "id", "1"));
        assert!(!TableData::row_matches(&table.rows[0], "id", "01"));
        assert!(!TableData::row_matches(&table.rows[0], "missing", "1"));
    }

    #[test]
    fn test_lenient_row_decoding() {
        let json = r#"{"columns": ["id", "name"], "rows": [{"id": 7, "name": null}]}"#;
        let table: TableData = serde_json::from_str(json).unwrap();
        assert_eq!(table.rows[0].get("id").map(String::as_str), Some("7"));
        assert!(table.rows[0].get("name").is_none());
    }

    #[test]
    fn test_json_layout() {
        let json = serde_json::to_value(users()).unwrap();
        assert_eq!(json["columns"][1], "name");
        assert_eq!(json["rows"][0]["name"], "Alice");
    }
}
