use log::debug;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::Path;

/// Filename of the sidecar database, relative to the repository gitdir.
pub const INDEX_FILENAME: &str = "feature_envelopes.db";

const LOOKUP_SQL: &str = "SELECT envelope FROM feature_envelopes WHERE blob_id=?;";

/// How opening the sidecar failed: a repository without the file (or an
/// unreadable one) degrades to match-all, while a file that opens but
/// cannot serve the lookup is a hard error.
#[derive(Debug)]
pub enum IndexOpenError {
    Unavailable(rusqlite::Error),
    Prepare(rusqlite::Error),
}

/// Read-only view of the envelope sidecar. One row per feature blob,
/// keyed by the blob's raw hash bytes; a missing row means the blob has
/// no recorded envelope and always matches.
pub struct EnvelopeIndex {
    conn: Connection,
}

impl std::fmt::Debug for EnvelopeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeIndex").finish_non_exhaustive()
    }
}

impl EnvelopeIndex {
    /// Opens `{gitdir}/feature_envelopes.db` read-only.
    pub fn open(gitdir: &Path) -> Result<Self, IndexOpenError> {
        let path = gitdir.join(INDEX_FILENAME);
        debug!("DB: {}", path.display());
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(IndexOpenError::Unavailable)?;
        // Prepare the lookup once up front; the statement cache keeps it
        // alive for the life of the connection, and a broken schema
        // surfaces here rather than mid-enumeration.
        conn.prepare_cached(LOOKUP_SQL)
            .map_err(IndexOpenError::Prepare)?;
        debug!("Query SQL: {}", LOOKUP_SQL);
        Ok(Self { conn })
    }

    /// Envelope bytes for one blob, or `None` when no row is recorded.
    /// The cached statement is reset and rebound on every call.
    pub fn lookup(&self, blob_id: &[u8]) -> Result<Option<Vec<u8>>, rusqlite::Error> {
        let mut stmt = self.conn.prepare_cached(LOOKUP_SQL)?;
        stmt.query_row(rusqlite::params![blob_id], |row| row.get(0))
            .optional()
    }
}
