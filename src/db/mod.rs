pub mod migrations;
pub mod queries;

use anyhow::Context;
use rusqlite::{Connection, Transaction, TransactionBehavior};

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch(
        "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;",
    )
    .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// Runs `f` inside an IMMEDIATE transaction: SQLite takes the write lock before
/// the first read, so a check-then-write sequence cannot interleave with another
/// writer. Commits on `Ok`, rolls back on `Err`.
pub fn run_in_transaction<T, E, F>(conn: &mut Connection, f: F) -> Result<T, E>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, E>,
    E: From<rusqlite::Error>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    match f(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            // Dropping the transaction rolls it back; do it explicitly so a
            // rollback failure is at least visible in the logs.
            if let Err(rb) = tx.rollback() {
                tracing::error!(error = %rb, "transaction rollback failed");
            }
            Err(e)
        }
    }
}
