//! Statement builders for the job table.
//!
//! The overlay protocol only accepts statement text, so values are rendered
//! as literals here. Identifiers are validated and text literals are quoted
//! with doubled single quotes; numeric ids are rendered from integers only.

use crate::error::{Error, Result};

/// Check that `name` is a plain SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn validate_identifier(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}

/// Render `value` as a single-quoted SQL text literal.
pub fn quote_text(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' {
            quoted.push('\'');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

/// `CREATE TABLE` for the job table: `id INTEGER, data TEXT, timestamp TEXT`.
pub fn create_table(table: &str) -> Result<String> {
    let table = validate_identifier(table)?;
    Ok(format!(
        "CREATE TABLE {} (id INTEGER, data TEXT, timestamp TEXT)",
        table
    ))
}

/// Secondary index on the id column.
pub fn create_id_index(table: &str) -> Result<String> {
    let table = validate_identifier(table)?;
    Ok(format!("CREATE INDEX idx_{0}_id ON {0} (id)", table))
}

/// `INSERT` of one job row.
pub fn insert_job(table: &str, id: u64, data: &str, timestamp: &str) -> Result<String> {
    let table = validate_identifier(table)?;
    Ok(format!(
        "INSERT INTO {} (id, data, timestamp) VALUES ({}, {}, {})",
        table,
        id,
        quote_text(data),
        quote_text(timestamp)
    ))
}

/// Point lookup of one job row by id.
pub fn select_job(table: &str, id: u64) -> Result<String> {
    let table = validate_identifier(table)?;
    Ok(format!(
        "SELECT id, data, timestamp FROM {} WHERE id = {}",
        table, id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{extract_columns, source_table, ColumnList};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("jobs").is_ok());
        assert!(validate_identifier("_jobs_2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2jobs").is_err());
        assert!(validate_identifier("jobs; DROP TABLE x").is_err());
        assert!(validate_identifier("jöbs").is_err());
    }

    #[test]
    fn test_quote_text_escapes_quotes() {
        assert_eq!(quote_text("plain"), "'plain'");
        assert_eq!(quote_text("O'Brien"), "'O''Brien'");
        assert_eq!(quote_text("''"), "''''''");
    }

    #[test]
    fn test_insert_job() {
        let sql = insert_job("jobs", 3, r#"{"CustomerName":"Ann O'Lee"}"#, "2024-01-01T00:00:00Z")
            .unwrap();
        assert_eq!(
            sql,
            r#"INSERT INTO jobs (id, data, timestamp) VALUES (3, '{"CustomerName":"Ann O''Lee"}', '2024-01-01T00:00:00Z')"#
        );
        assert_eq!(extract_columns(&sql).unwrap(), None);
    }

    #[test]
    fn test_select_job_columns_match_schema() {
        let sql = select_job("jobs", 9).unwrap();
        assert_eq!(sql, "SELECT id, data, timestamp FROM jobs WHERE id = 9");
        assert_eq!(source_table(&sql).unwrap(), "jobs");
        assert_eq!(
            extract_columns(&sql).unwrap(),
            Some(ColumnList::Named(vec![
                "id".into(),
                "data".into(),
                "timestamp".into()
            ]))
        );
    }

    #[test]
    fn test_schema_statements() {
        assert_eq!(
            create_table("jobs").unwrap(),
            "CREATE TABLE jobs (id INTEGER, data TEXT, timestamp TEXT)"
        );
        assert_eq!(
            create_id_index("jobs").unwrap(),
            "CREATE INDEX idx_jobs_id ON jobs (id)"
        );
        assert!(create_table("bad name").is_err());
    }
}
