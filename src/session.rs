//! Ties the REPL to one open `Database` for the process's lifetime. The
//! store has no notion of multiple open databases or switching between them
//! (see spec's Non-goals on multi-table schemas) — a session is just the
//! database plus the path it was opened from, so `.exit` can flush and close
//! it cleanly.
use std::path::PathBuf;

use crate::errors::Error;
use crate::storage::Database;

pub struct Session {
    pub path: PathBuf,
    pub database: Database,
}

impl Session {
    pub fn open(path: PathBuf) -> Result<Self, Error> {
        let database = Database::open(&path)?;
        Ok(Session { path, database })
    }

    /// Flushes and closes the underlying database file.
    pub fn close(self) -> Result<(), Error> {
        self.database.close()
    }
}
