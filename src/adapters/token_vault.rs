use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use thiserror::Error;

use crate::adapters::db::{self, DbError, Table};

const TOKEN_KEY: &str = "bearer_token";

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("store lock poisoned")]
    LockPoisoned,
    #[error("store operation failed: {0}")]
    Store(#[from] DbError),
}

/// Storage seam for the bearer token. An unavailable store surfaces as an
/// error; callers must not treat it as "logged out".
pub trait TokenVault: Send + Sync {
    fn set(&self, token: &str) -> Result<(), VaultError>;
    fn get(&self) -> Result<Option<String>, VaultError>;
    fn remove(&self) -> Result<(), VaultError>;
}

/// Token vault over the shared sqlite store. Holds no in-memory copy of the
/// token; every read goes to the store so external changes are always seen.
#[derive(Clone)]
pub struct SqliteTokenVault {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteTokenVault {
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, DbError>,
    ) -> Result<T, VaultError> {
        let connection = self.connection.lock().map_err(|_| VaultError::LockPoisoned)?;
        op(&connection).map_err(VaultError::from)
    }
}

impl TokenVault for SqliteTokenVault {
    fn set(&self, token: &str) -> Result<(), VaultError> {
        self.with_connection(|connection| {
            db::set_value(connection, Table::Secrets, TOKEN_KEY, token)
        })
    }

    fn get(&self) -> Result<Option<String>, VaultError> {
        self.with_connection(|connection| db::get_value(connection, Table::Secrets, TOKEN_KEY))
    }

    fn remove(&self) -> Result<(), VaultError> {
        self.with_connection(|connection| db::remove_value(connection, Table::Secrets, TOKEN_KEY))
    }
}
