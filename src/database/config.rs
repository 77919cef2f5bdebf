use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::models::SectionRow;

pub fn list_sections(conn: &Connection) -> Result<Vec<SectionRow>> {
    let sql = "SELECT name, body, version, updated_at FROM config_sections ORDER BY name";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], parse_section_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to list config sections")?;

    Ok(rows)
}

pub fn find_section(conn: &Connection, name: &str) -> Result<Option<SectionRow>> {
    let sql = "SELECT name, body, version, updated_at FROM config_sections WHERE name = ?1";

    conn.query_row(sql, params![name], parse_section_row)
        .optional()
        .context("Failed to query config section")
}

/// Seeds a section row. Returns false when the row already exists.
pub fn insert_section_if_missing(
    conn: &Connection,
    name: &str,
    body: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let sql = "INSERT OR IGNORE INTO config_sections (name, body, version, updated_at) VALUES (?1, ?2, 1, ?3)";

    let inserted = conn
        .execute(sql, params![name, body, now])
        .context("Failed to seed config section")?;
    Ok(inserted == 1)
}

/// Writes a section only if it is still at `expected_version`.
/// Returns the new version, or `None` when another write got there first.
pub fn update_section(
    conn: &Connection,
    name: &str,
    body: &str,
    expected_version: i64,
    now: DateTime<Utc>,
) -> Result<Option<i64>> {
    let sql = "UPDATE config_sections SET body = ?1, version = version + 1, updated_at = ?2 WHERE name = ?3 AND version = ?4 RETURNING version";

    conn.query_row(sql, params![body, now, name, expected_version], |r| r.get(0))
        .optional()
        .context("Failed to update config section")
}

fn parse_section_row(row: &rusqlite::Row) -> rusqlite::Result<SectionRow> {
    Ok(SectionRow {
        name: row.get(0)?,
        body: row.get(1)?,
        version: row.get(2)?,
        updated_at: row.get(3)?,
    })
}
