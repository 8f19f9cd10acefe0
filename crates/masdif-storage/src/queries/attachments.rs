// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transient binary attachments (synthesized audio).

use std::str::FromStr;

use masdif_core::{Attachment, AttachmentKind, MasdifError};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, conversion_err, map_tr_err};

pub async fn insert_attachment(db: &Database, attachment: &Attachment) -> Result<(), MasdifError> {
    let a = attachment.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO attachments (file_name, message_id, kind, content_type, data, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    a.file_name,
                    a.message_id,
                    a.kind.to_string(),
                    a.content_type,
                    a.data,
                    a.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_attachment(db: &Database, file_name: &str) -> Result<Option<Attachment>, MasdifError> {
    let file_name = file_name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Attachment>, rusqlite::Error> {
            conn.query_row(
                "SELECT file_name, message_id, kind, content_type, data, created_at
                 FROM attachments WHERE file_name = ?1",
                params![file_name],
                |row| {
                    let kind: String = row.get(2)?;
                    Ok(Attachment {
                        file_name: row.get(0)?,
                        message_id: row.get(1)?,
                        kind: AttachmentKind::from_str(&kind).map_err(|e| conversion_err(2, e))?,
                        content_type: row.get(3)?,
                        data: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes the message's attachments of the given kind. Returns how many were removed.
pub async fn purge_attachments(
    db: &Database,
    message_id: &str,
    kind: AttachmentKind,
) -> Result<usize, MasdifError> {
    let message_id = message_id.to_string();
    let kind = kind.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM attachments WHERE message_id = ?1 AND kind = ?2",
                params![message_id, kind],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes every attachment created strictly before `cutoff`.
pub async fn purge_older_than(db: &Database, cutoff: &str) -> Result<usize, MasdifError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM attachments WHERE created_at < ?1",
                params![cutoff],
            )
        })
        .await
        .map_err(map_tr_err)
}
