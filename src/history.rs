use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use clap::ValueEnum;
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use tracing::{debug, info};

use crate::app_dirs::AppDirs;
use crate::error::HistoryError;
use crate::session::{SessionReport, SessionResult};
use crate::tally::TallySnapshot;
use crate::tune::GameMode;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        played_at TEXT NOT NULL,
        mode TEXT NOT NULL,
        result TEXT NOT NULL,
        elapsed_secs REAL NOT NULL,
        successes INTEGER NOT NULL,
        failures INTEGER NOT NULL,
        too_early INTEGER NOT NULL,
        too_late INTEGER NOT NULL,
        snake_attacks INTEGER NOT NULL,
        cancelled INTEGER NOT NULL,
        damage_taken INTEGER NOT NULL,
        hp_restored INTEGER NOT NULL,
        starting_health INTEGER NOT NULL,
        ending_health INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_sessions_played_at ON sessions(played_at);
"#;

const SELECT_COLUMNS: &str = "id, played_at, mode, result, elapsed_secs, successes, failures, \
     too_early, too_late, snake_attacks, cancelled, damage_taken, hp_restored, \
     starting_health, ending_health";

/// A stored session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: i64,
    pub played_at: DateTime<Local>,
    pub report: SessionReport,
}

/// Totals across every stored session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistorySummary {
    pub sessions: u32,
    pub wins: u32,
    pub losses: u32,
    pub successes: u64,
    pub failures: u64,
    pub damage_taken: u64,
    pub hp_restored: u64,
}

impl HistorySummary {
    pub fn success_rate(&self) -> Option<f64> {
        match self.successes + self.failures {
            0 => None,
            n => Some(self.successes as f64 / n as f64),
        }
    }
}

/// Flat CSV layout of a session record.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: i64,
    played_at: String,
    mode: &'a str,
    result: &'a str,
    elapsed_secs: f64,
    successes: u32,
    failures: u32,
    too_early: u32,
    too_late: u32,
    snake_attacks: u32,
    cancelled: u32,
    damage_taken: u64,
    hp_restored: u64,
    starting_health: u32,
    ending_health: u32,
}

/// Session history backed by SQLite.
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Opens the history database in the state dir, creating it if needed.
    pub fn open_default() -> Result<Self, HistoryError> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("tunecast_history.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HistoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "opening history database");
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, HistoryError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, HistoryError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn record_session(
        &self,
        report: &SessionReport,
        played_at: DateTime<Local>,
    ) -> Result<i64, HistoryError> {
        let t = &report.tally;
        self.conn.execute(
            r#"
            INSERT INTO sessions
            (played_at, mode, result, elapsed_secs, successes, failures, too_early, too_late,
             snake_attacks, cancelled, damage_taken, hp_restored, starting_health, ending_health)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                played_at.to_rfc3339(),
                mode_label(report.mode),
                result_label(report.result),
                report.elapsed_secs,
                t.successes,
                t.failures,
                t.too_early,
                t.too_late,
                t.snake_attacks,
                t.cancelled,
                t.damage_taken,
                t.hp_restored,
                t.starting_health,
                t.ending_health,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(id, result = %report.result, "session saved to history");
        Ok(id)
    }

    /// The `limit` most recent sessions, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<SessionRecord>, HistoryError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM sessions ORDER BY played_at DESC, id DESC LIMIT ?1"
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([limit], RawRow::read)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    pub fn summary(&self) -> Result<HistorySummary, HistoryError> {
        let summary = self.conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN result = 'win' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN result = 'lose' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(successes), 0),
                COALESCE(SUM(failures), 0),
                COALESCE(SUM(damage_taken), 0),
                COALESCE(SUM(hp_restored), 0)
            FROM sessions
            "#,
            [],
            |row| {
                Ok(HistorySummary {
                    sessions: row.get(0)?,
                    wins: row.get(1)?,
                    losses: row.get(2)?,
                    successes: row.get(3)?,
                    failures: row.get(4)?,
                    damage_taken: row.get(5)?,
                    hp_restored: row.get(6)?,
                })
            },
        )?;
        Ok(summary)
    }

    pub fn clear(&self) -> Result<(), HistoryError> {
        let removed = self.conn.execute("DELETE FROM sessions", [])?;
        info!(removed, "history cleared");
        Ok(())
    }

    /// Writes every stored session as CSV, oldest first. Returns the row count.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize, HistoryError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM sessions ORDER BY played_at ASC, id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], RawRow::read)?;

        let mut out = csv::Writer::from_writer(writer);
        let mut count = 0;
        for row in rows {
            let record = row?.into_record()?;
            let t = &record.report.tally;
            out.serialize(CsvRow {
                id: record.id,
                played_at: record.played_at.to_rfc3339(),
                mode: mode_label(record.report.mode),
                result: result_label(record.report.result),
                elapsed_secs: record.report.elapsed_secs,
                successes: t.successes,
                failures: t.failures,
                too_early: t.too_early,
                too_late: t.too_late,
                snake_attacks: t.snake_attacks,
                cancelled: t.cancelled,
                damage_taken: t.damage_taken,
                hp_restored: t.hp_restored,
                starting_health: t.starting_health,
                ending_health: t.ending_health,
            })?;
            count += 1;
        }
        out.flush()?;
        debug!(count, "history exported");
        Ok(count)
    }
}

/// A row as SQLite hands it back, before the text columns are parsed.
struct RawRow {
    id: i64,
    played_at: String,
    mode: String,
    result: String,
    elapsed_secs: f64,
    tally: TallySnapshot,
}

impl RawRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            played_at: row.get(1)?,
            mode: row.get(2)?,
            result: row.get(3)?,
            elapsed_secs: row.get(4)?,
            tally: TallySnapshot {
                successes: row.get(5)?,
                failures: row.get(6)?,
                too_early: row.get(7)?,
                too_late: row.get(8)?,
                snake_attacks: row.get(9)?,
                cancelled: row.get(10)?,
                damage_taken: row.get(11)?,
                hp_restored: row.get(12)?,
                starting_health: row.get(13)?,
                ending_health: row.get(14)?,
            },
        })
    }

    fn into_record(self) -> Result<SessionRecord, HistoryError> {
        let id = self.id;
        let corrupt = |column: &'static str, value: String| HistoryError::CorruptRow {
            id,
            column,
            value,
        };

        let played_at = DateTime::parse_from_rfc3339(&self.played_at)
            .map_err(|_| corrupt("played_at", self.played_at.clone()))?
            .with_timezone(&Local);
        let mode = GameMode::from_str(&self.mode, true).map_err(|_| corrupt("mode", self.mode))?;
        let result = match self.result.as_str() {
            "win" => SessionResult::Win,
            "lose" => SessionResult::Lose,
            other => return Err(corrupt("result", other.to_string())),
        };

        Ok(SessionRecord {
            id,
            played_at,
            report: SessionReport {
                mode,
                result,
                elapsed_secs: self.elapsed_secs,
                tally: self.tally,
            },
        })
    }
}

fn mode_label(mode: GameMode) -> &'static str {
    match mode {
        GameMode::Simple => "simple",
        GameMode::Advanced => "advanced",
    }
}

fn result_label(result: SessionResult) -> &'static str {
    match result {
        SessionResult::Win => "win",
        SessionResult::Lose => "lose",
    }
}
