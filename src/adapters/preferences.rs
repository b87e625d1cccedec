use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use thiserror::Error;

use crate::adapters::db::{self, DbError, Table};

const LAST_CHECK_KEY: &str = "last_invoice_check";
const LAST_COUNT_KEY: &str = "last_invoice_count";

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("store lock poisoned")]
    LockPoisoned,
    #[error("store operation failed: {0}")]
    Store(#[from] DbError),
}

/// Last point up to which invoices have been reported to the user, together
/// with the invoice count observed at that point. The two values are always
/// read and written as a pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    pub last_check_time: DateTime<Utc>,
    pub last_invoice_count: i64,
}

pub trait PreferenceStore: Send + Sync {
    /// `None` when no checkpoint was ever persisted or the stored timestamp
    /// is unreadable; the caller substitutes its sentinel default.
    fn checkpoint(&self) -> Result<Option<Checkpoint>, PrefsError>;
    fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), PrefsError>;
    fn clear_checkpoint(&self) -> Result<(), PrefsError>;
}

#[derive(Clone)]
pub struct SqlitePreferences {
    connection: Arc<Mutex<Connection>>,
}

impl SqlitePreferences {
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, DbError>,
    ) -> Result<T, PrefsError> {
        let connection = self.connection.lock().map_err(|_| PrefsError::LockPoisoned)?;
        op(&connection).map_err(PrefsError::from)
    }
}

impl PreferenceStore for SqlitePreferences {
    fn checkpoint(&self) -> Result<Option<Checkpoint>, PrefsError> {
        let (raw_time, raw_count) = self.with_connection(|connection| {
            Ok((
                db::get_value(connection, Table::Preferences, LAST_CHECK_KEY)?,
                db::get_value(connection, Table::Preferences, LAST_COUNT_KEY)?,
            ))
        })?;

        let Some(raw_time) = raw_time else {
            return Ok(None);
        };

        let last_check_time = match DateTime::parse_from_rfc3339(&raw_time) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(error) => {
                tracing::warn!(error = %error, raw = %raw_time, "stored checkpoint timestamp is unreadable");
                return Ok(None);
            }
        };

        let last_invoice_count = raw_count
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(0);

        Ok(Some(Checkpoint {
            last_check_time,
            last_invoice_count,
        }))
    }

    fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), PrefsError> {
        let time = checkpoint
            .last_check_time
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let count = checkpoint.last_invoice_count.to_string();

        self.with_connection(|connection| {
            db::set_value(connection, Table::Preferences, LAST_CHECK_KEY, &time)?;
            db::set_value(connection, Table::Preferences, LAST_COUNT_KEY, &count)
        })
    }

    fn clear_checkpoint(&self) -> Result<(), PrefsError> {
        self.with_connection(|connection| {
            db::remove_value(connection, Table::Preferences, LAST_CHECK_KEY)?;
            db::remove_value(connection, Table::Preferences, LAST_COUNT_KEY)
        })
    }
}
