//! SQLite-backed operator event log.
//!
//! Events recorded by the intake loop are persisted to a local `log_procesos`
//! table so the operator can review them later with `dtewatch log`. Failures
//! here are logged and swallowed; persistence must never stall the intake
//! loop.

use std::path::Path;
use std::sync::Mutex;

use chrono::Local;
use rusqlite::{Connection, params};
use tracing::warn;

use dtewatch_core::{LogSink, Severity};

/// One persisted operator event.
#[derive(Debug)]
pub struct EventRow {
    pub fecha: String,
    pub hora: String,
    pub tipo: String,
    pub asunto: String,
}

pub struct EventLog {
    conn: Mutex<Connection>,
}

impl EventLog {
    /// Open (or create) the event database at `path`.
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS log_procesos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fecha TEXT NOT NULL,
                hora TEXT NOT NULL,
                tipo TEXT NOT NULL,
                asunto TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert one event stamped with the local date and time.
    pub fn insert(&self, tipo: &str, asunto: &str) -> rusqlite::Result<()> {
        let now = Local::now();
        let conn = self.conn.lock().expect("event log mutex poisoned");
        conn.execute(
            "INSERT INTO log_procesos (fecha, hora, tipo, asunto) VALUES (?1, ?2, ?3, ?4)",
            params![
                now.format("%d/%m/%Y").to_string(),
                now.format("%H:%M:%S").to_string(),
                tipo,
                asunto,
            ],
        )?;
        Ok(())
    }

    /// The most recent events, newest first.
    pub fn recent(&self, limit: u32) -> rusqlite::Result<Vec<EventRow>> {
        let conn = self.conn.lock().expect("event log mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT fecha, hora, tipo, asunto FROM log_procesos ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok(EventRow {
                fecha: row.get(0)?,
                hora: row.get(1)?,
                tipo: row.get(2)?,
                asunto: row.get(3)?,
            })
        })?;
        rows.collect()
    }
}

impl LogSink for EventLog {
    fn record(&self, message: &str, severity: Severity) {
        if let Err(e) = self.insert(severity.label(), message) {
            warn!("no se pudo persistir el evento: {e}");
        }
    }
}
