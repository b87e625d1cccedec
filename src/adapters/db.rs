use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

pub const LATEST_SCHEMA_VERSION: u32 = 1;

const MIGRATIONS: &[(u32, &str)] = &[(
    1,
    r#"
CREATE TABLE IF NOT EXISTS secrets (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS preferences (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#,
)];

#[derive(Debug, Error)]
pub enum DbError {
    #[error("store operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported schema version {current}; latest supported is {latest}")]
    UnsupportedSchemaVersion { current: u32, latest: u32 },
}

/// The two key-value tables backing the client. Secrets hold the bearer
/// token; preferences hold the notification checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Secrets,
    Preferences,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Secrets => "secrets",
            Table::Preferences => "preferences",
        }
    }
}

pub fn open_connection(path: &str) -> Result<Connection, DbError> {
    Connection::open(path).map_err(DbError::from)
}

pub fn run_migrations(connection: &mut Connection) -> Result<(), DbError> {
    let current_version = schema_version(connection)?;

    if current_version > LATEST_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            current: current_version,
            latest: LATEST_SCHEMA_VERSION,
        });
    }

    let transaction = connection.transaction()?;

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            transaction.execute_batch(sql)?;
            transaction.pragma_update(None, "user_version", version)?;
        }
    }

    transaction.commit()?;

    Ok(())
}

pub fn schema_version(connection: &Connection) -> Result<u32, DbError> {
    let version = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

pub fn get_value(
    connection: &Connection,
    table: Table,
    key: &str,
) -> Result<Option<String>, DbError> {
    let sql = format!("SELECT value FROM {} WHERE key = ?1", table.name());
    let value = connection
        .query_row(&sql, params![key], |row| row.get(0))
        .optional()?;
    Ok(value)
}

pub fn set_value(
    connection: &Connection,
    table: Table,
    key: &str,
    value: &str,
) -> Result<(), DbError> {
    let sql = format!(
        "INSERT INTO {} (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        table.name()
    );
    connection.execute(&sql, params![key, value])?;
    Ok(())
}

pub fn remove_value(connection: &Connection, table: Table, key: &str) -> Result<(), DbError> {
    let sql = format!("DELETE FROM {} WHERE key = ?1", table.name());
    connection.execute(&sql, params![key])?;
    Ok(())
}
