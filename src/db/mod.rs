pub mod migrations;
pub mod queries;

use anyhow::Context;
use rusqlite::{Connection, Transaction};

use crate::errors::AppError;

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// Runs `f` as one unit of work: committed if it returns `Ok`, rolled back
/// otherwise.
pub fn in_transaction<T, F>(conn: &mut Connection, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, AppError>,
{
    let tx = conn.transaction()?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}
