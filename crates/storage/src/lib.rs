//! Durable storage collaborator.
//!
//! Commands persist small JSON documents grouped in named collections and
//! query them back with equality filters. Two backends: [`MemoryStore`]
//! for tests and throwaway runs, [`SqliteStore`] for production.

pub mod error;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;

pub use {
    error::{Error, Result},
    store::{Document, DocumentStore, Filter},
    store_memory::MemoryStore,
    store_sqlite::SqliteStore,
};

/// Run database migrations for the document store.
///
/// Creates the `documents` table. Call at startup before handing a shared
/// pool to [`SqliteStore::with_pool`].
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
