use std::path::{Path, PathBuf};

use anyhow::Context;
use core_model::{HistoryItem, HistorySource, Visit};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::debug;

const REQUIRED_TABLES: [&str; 2] = ["history_items", "history_visits"];

/// Read-only handle on Safari's `History.db`.
pub struct SafariStore {
    conn: Connection,
}

pub fn default_history_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join("Library").join("Safari").join("History.db"))
}

impl SafariStore {
    pub fn open_default() -> anyhow::Result<Self> {
        Self::open(default_history_path()?)
    }

    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("opening history db {}", path.display()))?;
        let store = Self { conn };
        store
            .verify_schema()
            .with_context(|| format!("reading history db {}", path.display()))?;
        debug!(path = %path.display(), "history db opened");
        Ok(store)
    }

    fn verify_schema(&self) -> anyhow::Result<()> {
        for table in REQUIRED_TABLES {
            let exists: bool = self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                params![table],
                |r| r.get(0),
            )?;
            if !exists {
                anyhow::bail!("not a Safari history database: missing '{table}' table");
            }
        }
        Ok(())
    }
}

impl HistorySource for SafariStore {
    fn find_item(&self, url: &str) -> anyhow::Result<Option<HistoryItem>> {
        self.conn
            .query_row(
                "SELECT id, url, visit_count FROM history_items WHERE url = ?1",
                params![url],
                |r| {
                    Ok(HistoryItem {
                        id: r.get(0)?,
                        url: r.get(1)?,
                        visit_count: r.get(2)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("looking up history item for {url}"))
    }

    fn first_visit(&self, item_id: i64) -> anyhow::Result<Option<Visit>> {
        self.conn
            .query_row(
                "SELECT CAST(visit_time AS INTEGER), COALESCE(title, '') FROM history_visits WHERE history_item = ?1 ORDER BY visit_time ASC, id ASC LIMIT 1",
                params![item_id],
                |r| {
                    Ok(Visit {
                        timestamp: r.get(0)?,
                        title: r.get(1)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("fetching first visit of item {item_id}"))
    }

    fn recent_visits(&self, item_id: i64, row_limit: Option<u32>) -> anyhow::Result<Vec<Visit>> {
        // SQLite treats a negative LIMIT as no limit.
        let limit = row_limit.map_or(-1, i64::from);
        let mut stmt = self.conn.prepare(
            r#"SELECT visit_ts, title FROM (
                 SELECT id, visit_time, CAST(visit_time AS INTEGER) AS visit_ts, COALESCE(title, '') AS title
                 FROM history_visits
                 WHERE history_item = ?1
                 ORDER BY visit_time DESC, id DESC
                 LIMIT ?2
               )
               ORDER BY visit_time ASC, id ASC"#,
        )?;
        let rows = stmt.query_map(params![item_id, limit], |r| {
            Ok(Visit {
                timestamp: r.get(0)?,
                title: r.get(1)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("fetching visits of item {item_id}"))
    }
}
