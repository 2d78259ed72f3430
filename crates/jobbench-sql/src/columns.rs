//! Column extraction for SELECT statements.
//!
//! Overlay replies carry values only. [`extract_columns`] recovers the
//! caller-facing column names from the statement text, and [`Row::pair`]
//! zips them back onto a reply row. A `SELECT *` cannot be resolved from the
//! text alone; callers run [`SCHEMA_DISCOVERY_QUERY`] and hand the reply to
//! [`columns_from_schema`].

use crate::error::{Error, Result};

/// Side query used to resolve `SELECT *` column lists.
pub const SCHEMA_DISCOVERY_QUERY: &str = "select * from sqlite_master";

/// Column list requested by a SELECT statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnList {
    /// Explicit names, in the order the overlay returns them.
    Named(Vec<String>),
    /// `SELECT *`; the names come from schema discovery.
    Wildcard,
}

/// A single untyped value in an overlay reply row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Cell {
    /// Text content, if this cell holds text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content. Text cells holding a decimal integer are accepted,
    /// since some overlay transports return every scalar as a string.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Cell::Integer(i) => Some(*i),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Check if this cell is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

/// A reply row paired with its column names.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Cell>,
}

impl Row {
    /// Pair an untyped reply row with the column names extracted from the
    /// statement that produced it.
    pub fn pair(columns: &[String], values: Vec<Cell>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(Error::ColumnCountMismatch {
                expected: columns.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            columns: columns.to_vec(),
            values,
        })
    }

    /// Look up a value by column name (ASCII case-insensitive).
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|i| &self.values[i])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the row into `(name, value)` pairs.
    pub fn into_pairs(self) -> Vec<(String, Cell)> {
        self.columns.into_iter().zip(self.values).collect()
    }
}

/// Extract the column list of a SELECT statement.
///
/// Returns `Ok(None)` for anything that is not a SELECT. Each entry of the
/// list is trimmed; an entry containing ` as ` (any case) resolves to the
/// alias after it.
pub fn extract_columns(sql: &str) -> Result<Option<ColumnList>> {
    let sql = sql.trim();
    let Some(body_start) = select_body_start(sql) else {
        return Ok(None);
    };

    let from = find_from(sql).ok_or_else(|| Error::MissingFrom(sql.to_string()))?;
    if from < body_start {
        return Err(Error::EmptyColumnList(sql.to_string()));
    }

    let fragment = sql[body_start..from].trim();
    if fragment.is_empty() {
        return Err(Error::EmptyColumnList(sql.to_string()));
    }
    if fragment == "*" {
        return Ok(Some(ColumnList::Wildcard));
    }

    let mut names = Vec::new();
    for (index, piece) in fragment.split(',').enumerate() {
        let piece = piece.trim();
        if piece.is_empty() {
            return Err(Error::EmptyColumn {
                index,
                query: sql.to_string(),
            });
        }
        names.push(resolve_alias(piece).to_string());
    }

    Ok(Some(ColumnList::Named(names)))
}

/// Name of the table after the first FROM keyword.
pub fn source_table(sql: &str) -> Result<&str> {
    let sql = sql.trim();
    let from = find_from(sql).ok_or_else(|| Error::MissingFrom(sql.to_string()))?;
    let rest = sql[from + "FROM".len()..].trim_start();
    let end = rest
        .find(|c: char| !(is_identifier_char(c) || c == '"' || c == '`' || c == '.'))
        .unwrap_or(rest.len());
    let table = rest[..end].trim_matches(is_quote);

    if table.is_empty() {
        Err(Error::MissingTable(sql.to_string()))
    } else {
        Ok(table)
    }
}

/// Resolve column names of `table` from a [`SCHEMA_DISCOVERY_QUERY`] reply.
///
/// `sqlite_master` rows are `(type, name, tbl_name, rootpage, sql)`; the
/// column names are read from the `CREATE TABLE` text.
pub fn columns_from_schema(rows: &[Vec<Cell>], table: &str) -> Result<Vec<String>> {
    let row = rows
        .iter()
        .find(|row| {
            let is_table = row.first().and_then(Cell::as_text) == Some("table");
            let name_matches = row
                .get(1)
                .and_then(Cell::as_text)
                .is_some_and(|name| name.eq_ignore_ascii_case(table));
            is_table && name_matches
        })
        .ok_or_else(|| Error::TableNotFound(table.to_string()))?;

    let ddl = row
        .get(4)
        .and_then(Cell::as_text)
        .ok_or_else(|| Error::MalformedSchema(format!("no CREATE statement for {}", table)))?;

    parse_column_definitions(ddl)
}

/// Byte offset right after a leading `SELECT` keyword, if present.
fn select_body_start(sql: &str) -> Option<usize> {
    const KEYWORD: &str = "SELECT";
    let head = sql.get(..KEYWORD.len())?;
    if !head.eq_ignore_ascii_case(KEYWORD) {
        return None;
    }
    let rest = &sql[KEYWORD.len()..];
    if rest.starts_with(|c: char| c.is_ascii_whitespace()) || rest.starts_with('*') {
        Some(KEYWORD.len())
    } else {
        None
    }
}

/// Byte offset of the first standalone FROM keyword.
fn find_from(sql: &str) -> Option<usize> {
    let upper = sql.to_ascii_uppercase();
    let bytes = upper.as_bytes();
    upper.match_indices("FROM").map(|(i, _)| i).find(|&i| {
        let before = i.checked_sub(1).map(|j| bytes[j]);
        let after = bytes.get(i + 4).copied();
        before.is_some_and(|b| b.is_ascii_whitespace() || b == b'*')
            && after.map_or(true, |b| b.is_ascii_whitespace())
    })
}

fn resolve_alias(piece: &str) -> &str {
    let lower = piece.to_ascii_lowercase();
    match lower.rfind(" as ") {
        Some(pos) => piece[pos + " as ".len()..].trim().trim_matches(is_quote),
        None => piece,
    }
}

fn parse_column_definitions(ddl: &str) -> Result<Vec<String>> {
    let malformed = || Error::MalformedSchema(ddl.to_string());

    let open = ddl.find('(').ok_or_else(malformed)?;
    let close = ddl.rfind(')').filter(|&c| c > open).ok_or_else(malformed)?;

    let mut columns = Vec::new();
    for definition in split_top_level(&ddl[open + 1..close]) {
        let Some(first) = definition.split_whitespace().next() else {
            continue;
        };
        if is_table_constraint(first) {
            continue;
        }
        columns.push(first.trim_matches(is_quote).to_string());
    }

    if columns.is_empty() {
        return Err(malformed());
    }
    Ok(columns)
}

/// Split on commas that are not nested inside parentheses.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

fn is_table_constraint(word: &str) -> bool {
    ["PRIMARY", "UNIQUE", "CHECK", "FOREIGN", "CONSTRAINT"]
        .iter()
        .any(|kw| word.eq_ignore_ascii_case(kw))
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_quote(c: char) -> bool {
    matches!(c, '"' | '`' | '[' | ']')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn named(names: &[&str]) -> Option<ColumnList> {
        Some(ColumnList::Named(names.iter().map(|s| s.to_string()).collect()))
    }

    #[test]
    fn test_extract_with_alias() {
        assert_eq!(
            extract_columns("SELECT a, b as c FROM t").unwrap(),
            named(&["a", "c"])
        );
    }

    #[test]
    fn test_extract_single_column() {
        assert_eq!(extract_columns("SELECT x FROM t").unwrap(), named(&["x"]));
    }

    #[test]
    fn test_extract_wildcard() {
        assert_eq!(
            extract_columns("SELECT * FROM t").unwrap(),
            Some(ColumnList::Wildcard)
        );
    }

    #[test]
    fn test_extract_is_idempotent() {
        let sql = "SELECT id, data AS payload, timestamp FROM jobs WHERE id = 4";
        let first = extract_columns(sql).unwrap();
        let second = extract_columns(sql).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, named(&["id", "payload", "timestamp"]));
    }

    #[test]
    fn test_alias_is_case_insensitive() {
        assert_eq!(
            extract_columns("SELECT count(*) As total, b aS c FROM t").unwrap(),
            named(&["total", "c"])
        );
    }

    #[test]
    fn test_statement_is_trimmed() {
        assert_eq!(
            extract_columns("   SELECT  a ,  b   FROM t  ").unwrap(),
            named(&["a", "b"])
        );
    }

    #[test]
    fn test_non_select_is_skipped() {
        assert_eq!(extract_columns("INSERT INTO t VALUES (1)").unwrap(), None);
        assert_eq!(extract_columns("CREATE TABLE t (a INTEGER)").unwrap(), None);
        assert_eq!(extract_columns("SELECTION FROM t").unwrap(), None);
    }

    #[test]
    fn test_missing_from() {
        let err = extract_columns("SELECT a, b").unwrap_err();
        assert!(matches!(err, Error::MissingFrom(_)));
    }

    #[test]
    fn test_from_inside_identifier_is_not_keyword() {
        assert_eq!(
            extract_columns("SELECT from_date, fromage FROM t").unwrap(),
            named(&["from_date", "fromage"])
        );
    }

    #[test]
    fn test_empty_column_entry() {
        let err = extract_columns("SELECT a,,b FROM t").unwrap_err();
        assert!(matches!(err, Error::EmptyColumn { index: 1, .. }));
    }

    #[test]
    fn test_empty_column_list() {
        let err = extract_columns("SELECT  FROM t").unwrap_err();
        assert!(matches!(err, Error::EmptyColumnList(_)));
    }

    #[test]
    fn test_source_table() {
        assert_eq!(source_table("SELECT * FROM jobs WHERE id = 1").unwrap(), "jobs");
        assert_eq!(source_table("SELECT a FROM \"jobs\"").unwrap(), "jobs");
        assert!(matches!(
            source_table("SELECT a FROM ").unwrap_err(),
            Error::MissingFrom(_) | Error::MissingTable(_)
        ));
    }

    #[test]
    fn test_columns_from_schema() {
        let rows = vec![
            vec![
                Cell::Text("index".into()),
                Cell::Text("idx_jobs_id".into()),
                Cell::Text("jobs".into()),
                Cell::Integer(3),
                Cell::Text("CREATE INDEX idx_jobs_id ON jobs (id)".into()),
            ],
            vec![
                Cell::Text("table".into()),
                Cell::Text("jobs".into()),
                Cell::Text("jobs".into()),
                Cell::Integer(2),
                Cell::Text(
                    "CREATE TABLE jobs (id INTEGER, data TEXT, timestamp TEXT, PRIMARY KEY (id))"
                        .into(),
                ),
            ],
        ];

        assert_eq!(
            columns_from_schema(&rows, "jobs").unwrap(),
            vec!["id", "data", "timestamp"]
        );
        assert!(matches!(
            columns_from_schema(&rows, "other").unwrap_err(),
            Error::TableNotFound(_)
        ));
    }

    #[test]
    fn test_schema_with_nested_parens() {
        let ddl = "CREATE TABLE t (\"a\" NUMERIC(10, 2), b TEXT CHECK (length(b) > 0))";
        assert_eq!(parse_column_definitions(ddl).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_row_pairing() {
        let columns = vec!["id".to_string(), "data".to_string()];
        let row = Row::pair(&columns, vec![Cell::Integer(7), Cell::Text("{}".into())]).unwrap();
        assert_eq!(row.get("DATA"), Some(&Cell::Text("{}".into())));
        assert_eq!(row.get("id").and_then(Cell::as_integer), Some(7));
        assert_eq!(row.get("missing"), None);

        let err = Row::pair(&columns, vec![Cell::Null]).unwrap_err();
        assert_eq!(
            err,
            Error::ColumnCountMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_cell_accessors() {
        assert_eq!(Cell::Text(" 42 ".into()).as_integer(), Some(42));
        assert_eq!(Cell::Real(1.5).as_integer(), None);
        assert!(Cell::Null.is_null());
        assert_eq!(Cell::Integer(1).as_text(), None);
    }
}
