use rusqlite::{Connection, Result as SqliteResult};
use std::path::Path;

/// Flat fortune-text store backed by SQLite.
///
/// One table, one text column, read with a single random-order limit-one
/// query. The quota bookkeeping never touches this store.
pub struct FortuneStore {
    conn: Connection,
}

impl FortuneStore {
    pub fn new(path: impl AsRef<Path>) -> SqliteResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_tables()?;
        Ok(store)
    }

    pub fn open_in_memory() -> SqliteResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> SqliteResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS fortunes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// One random fortune, or `None` when the table is empty.
    pub fn draw_random(&self) -> SqliteResult<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT text FROM fortunes ORDER BY RANDOM() LIMIT 1")?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn add_fortune(&self, text: &str) -> SqliteResult<i64> {
        self.conn
            .execute("INSERT INTO fortunes (text) VALUES (?1)", [text])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn count(&self) -> SqliteResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM fortunes", [], |row| row.get(0))
    }

    /// Drop the fortunes table so every later read fails. Test-only seam
    /// for exercising the storage-error path.
    #[cfg(test)]
    pub fn break_table(&self) -> SqliteResult<()> {
        self.conn.execute("DROP TABLE fortunes", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_on_empty_store_is_none() {
        let store = FortuneStore::open_in_memory().expect("in-memory store");
        assert_eq!(store.count().expect("count"), 0);
        assert_eq!(store.draw_random().expect("draw"), None);
    }

    #[test]
    fn draw_returns_a_seeded_row() {
        let store = FortuneStore::open_in_memory().expect("in-memory store");
        store.add_fortune("The east wind favors you.").expect("seed");
        store.add_fortune("Wait three days, then act.").expect("seed");
        assert_eq!(store.count().expect("count"), 2);

        let drawn = store.draw_random().expect("draw").expect("non-empty");
        assert!(
            drawn == "The east wind favors you." || drawn == "Wait three days, then act.",
            "unexpected row: {}",
            drawn
        );
    }
}
