//! Uploaded file blobs

use rusqlite::{OptionalExtension, Row, params};
use tracing::debug;

use super::{Store, StoredFile, decode_time, encode_time, now};
use crate::Result;

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<StoredFile> {
    let created_at: String = row.get(5)?;
    Ok(StoredFile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        filename: row.get(2)?,
        content: row.get(3)?,
        file_type: row.get(4)?,
        created_at: decode_time(5, &created_at)?,
    })
}

impl Store {
    /// Store a file for a user and return its id
    pub fn add_file(
        &self,
        user_id: &str,
        filename: &str,
        content: &[u8],
        file_type: &str,
    ) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = encode_time(&now());

        self.with_conn("add_file", |conn| {
            conn.execute(
                "INSERT INTO files (id, user_id, filename, content, file_type, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, user_id, filename, content, file_type, created_at],
            )?;
            Ok(())
        })?;

        debug!("Stored file {} ({} bytes) for user {}", filename, content.len(), user_id);
        Ok(id)
    }

    pub fn get_file(&self, id: &str) -> Result<Option<StoredFile>> {
        self.with_conn("get_file", |conn| {
            let file = conn
                .query_row(
                    "SELECT id, user_id, filename, content, file_type, created_at
                     FROM files WHERE id = ?1",
                    params![id],
                    file_from_row,
                )
                .optional()?;
            Ok(file)
        })
    }

    /// Files of a user, oldest first
    pub fn list_files(&self, user_id: &str) -> Result<Vec<StoredFile>> {
        self.with_conn("list_files", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, filename, content, file_type, created_at
                 FROM files WHERE user_id = ?1 ORDER BY created_at ASC, rowid ASC",
            )?;
            let files = stmt
                .query_map(params![user_id], file_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(files)
        })
    }
}
