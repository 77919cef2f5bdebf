use anyhow::{Context, Result};
use rusqlite::Connection;

/// Creates any missing tables. Safe to run on every start.
pub fn initialize_database(conn: &Connection) -> Result<()> {
    let schema_sql = include_str!("schema.sql");
    let statements = split_sql_statements(schema_sql);

    for (idx, statement) in statements.iter().enumerate() {
        execute_sql(conn, statement)
            .with_context(|| format!("Failed to execute statement {}", idx + 1))?;
    }

    log::info!("Database schema ready ({} statements)", statements.len());
    Ok(())
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(strip_comments)
        .filter(|s| !s.is_empty())
        .collect()
}

fn strip_comments(statement: &str) -> String {
    statement
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn execute_sql(conn: &Connection, sql: &str) -> Result<()> {
    conn.execute(sql, [])
        .context("Failed to execute SQL statement")
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_applies_twice() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_database(&conn).unwrap();
        initialize_database(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(tables, 7);
    }

    #[test]
    fn test_split_skips_comments() {
        let statements = split_sql_statements("-- header\nCREATE TABLE a (x INTEGER);\n\n-- trailing\n");
        assert_eq!(statements, vec!["CREATE TABLE a (x INTEGER)".to_string()]);
    }
}
