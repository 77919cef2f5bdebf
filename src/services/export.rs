use anyhow::Context;
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Serialize;
use serde_json::Value;
use tokio::process::Command;

use crate::config::settings::ExportSettings;
use crate::database::{self, AdminAction, DbPool, MatchRecord, OutboxEntry, Player, QueueEntry, SeasonReward};
use crate::errors::LeagueError;

/// How a database export is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exporter {
    /// Run an external dump tool; its stdout is the export.
    Shell { program: String, args: Vec<String> },
    /// Serialize every table of the local store to JSON.
    JsonSnapshot,
}

impl Exporter {
    fn extension(&self) -> &'static str {
        match self {
            Exporter::Shell { .. } => "dump",
            Exporter::JsonSnapshot => "json",
        }
    }

    fn content_type(&self) -> &'static str {
        match self {
            Exporter::Shell { .. } => "application/octet-stream",
            Exporter::JsonSnapshot => "application/json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SectionExport {
    name: String,
    version: i64,
    updated_at: DateTime<Utc>,
    body: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseSnapshot {
    exported_at: DateTime<Utc>,
    config_sections: Vec<SectionExport>,
    players: Vec<Player>,
    matches: Vec<MatchRecord>,
    queue: Vec<QueueEntry>,
    season_rewards: Vec<SeasonReward>,
    notifications: Vec<OutboxEntry>,
    admin_actions: Vec<AdminAction>,
}

pub struct ExportService {
    pool: DbPool,
    exporter: Exporter,
}

impl ExportService {
    pub fn new(pool: DbPool, exporter: Exporter) -> Self {
        Self { pool, exporter }
    }

    /// `pg_dump` when a Postgres URL is configured, JSON snapshot otherwise.
    pub fn from_settings(pool: DbPool, settings: &ExportSettings) -> Self {
        let exporter = match &settings.database_url {
            Some(url) => Exporter::Shell {
                program: settings.pg_dump_program.clone(),
                args: vec!["--format=custom".to_string(), "--no-owner".to_string(), url.clone()],
            },
            None => Exporter::JsonSnapshot,
        };
        Self::new(pool, exporter)
    }

    pub async fn export(&self, now: DateTime<Utc>) -> Result<ExportArtifact, LeagueError> {
        let bytes = match &self.exporter {
            Exporter::Shell { program, args } => run_dump(program, args).await?,
            Exporter::JsonSnapshot => self.snapshot(now)?,
        };

        let file_name = format!(
            "late-league-export-{}.{}",
            now.format("%Y%m%dT%H%M%SZ"),
            self.exporter.extension()
        );
        info!("Exported database as {} ({} bytes)", file_name, bytes.len());

        Ok(ExportArtifact {
            file_name,
            content_type: self.exporter.content_type(),
            bytes,
        })
    }

    fn snapshot(&self, now: DateTime<Utc>) -> Result<Vec<u8>, LeagueError> {
        let conn = self.pool.get()?;

        let config_sections = database::config::list_sections(&conn)?
            .into_iter()
            .map(|row| {
                let body = serde_json::from_str(&row.body)
                    .with_context(|| format!("Stored config section {} is not valid JSON", row.name))?;
                Ok(SectionExport {
                    name: row.name,
                    version: row.version,
                    updated_at: row.updated_at,
                    body,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let snapshot = DatabaseSnapshot {
            exported_at: now,
            config_sections,
            players: database::players::list_all(&conn)?,
            matches: database::matches::list_all(&conn)?,
            queue: database::queue::list(&conn)?,
            season_rewards: database::rewards::list_all(&conn)?,
            notifications: database::notifications::list_all(&conn)?,
            admin_actions: database::admin_actions::list_all(&conn)?,
        };

        Ok(serde_json::to_vec_pretty(&snapshot).context("Failed to encode database snapshot")?)
    }
}

/// Runs the dump tool. A missing tool and a non-zero exit are both
/// dependency failures; stderr only goes to the log.
async fn run_dump(program: &str, args: &[String]) -> Result<Vec<u8>, LeagueError> {
    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            error!("Could not start export tool {}: {}", program, e);
            LeagueError::ExternalDependency {
                dependency: "export tool",
                detail: format!("{} could not be started: {}", program, e),
            }
        })?;

    if !output.status.success() {
        error!(
            "Export tool {} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return Err(LeagueError::ExternalDependency {
            dependency: "export tool",
            detail: format!("{} exited with {}", program, output.status),
        });
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::setup::initialize_database;
    use crate::services::config::ConfigService;

    fn pool() -> DbPool {
        let pool = database::create_memory_pool().unwrap();
        initialize_database(&pool.get().unwrap()).unwrap();
        pool
    }

    fn shell(program: &str, args: &[&str]) -> Exporter {
        Exporter::Shell {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_exporter_follows_database_url() {
        let settings = ExportSettings {
            database_url: Some("postgres://league@db/league".to_string()),
            pg_dump_program: "/usr/bin/pg_dump".to_string(),
        };
        let service = ExportService::from_settings(pool(), &settings);
        assert_eq!(
            service.exporter,
            shell("/usr/bin/pg_dump", &["--format=custom", "--no-owner", "postgres://league@db/league"])
        );

        let service = ExportService::from_settings(pool(), &ExportSettings::default());
        assert_eq!(service.exporter, Exporter::JsonSnapshot);
    }

    #[tokio::test]
    async fn test_shell_export_returns_stdout() {
        let service = ExportService::new(pool(), shell("echo", &["dump-bytes"]));

        let artifact = service.export(Utc::now()).await.unwrap();

        assert_eq!(artifact.bytes, b"dump-bytes\n");
        assert!(artifact.file_name.starts_with("late-league-export-"));
        assert!(artifact.file_name.ends_with(".dump"));
    }

    #[tokio::test]
    async fn test_missing_tool_is_dependency_failure() {
        let service = ExportService::new(pool(), shell("late-league-no-such-dump-tool", &[]));

        let err = service.export(Utc::now()).await.unwrap_err();

        assert!(matches!(err, LeagueError::ExternalDependency { dependency: "export tool", .. }));
    }

    #[tokio::test]
    async fn test_failing_tool_is_dependency_failure() {
        let service = ExportService::new(pool(), shell("false", &[]));

        let err = service.export(Utc::now()).await.unwrap_err();

        assert!(matches!(err, LeagueError::ExternalDependency { .. }));
    }

    #[tokio::test]
    async fn test_json_snapshot_covers_tables() {
        let pool = pool();
        ConfigService::new(pool.clone()).initialize().unwrap();
        let service = ExportService::new(pool, Exporter::JsonSnapshot);

        let artifact = service.export(Utc::now()).await.unwrap();

        assert_eq!(artifact.content_type, "application/json");
        let json: Value = serde_json::from_slice(&artifact.bytes).unwrap();
        assert_eq!(json["configSections"].as_array().unwrap().len(), 8);
        assert_eq!(json["players"], Value::Array(Vec::new()));
        assert!(json["adminActions"].is_array());
    }
}
