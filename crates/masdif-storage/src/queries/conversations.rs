// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD operations.

use masdif_core::{Conversation, MasdifError};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

const COLUMNS: &str =
    "id, status, masdif_version, last_message_updated_at, created_at, updated_at";

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        status: row.get(1)?,
        masdif_version: row.get(2)?,
        last_message_updated_at: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub async fn create_conversation(db: &Database, conv: &Conversation) -> Result<(), MasdifError> {
    let conv = conv.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO conversations (id, status, masdif_version, last_message_updated_at,
                                            created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    conv.id,
                    conv.status,
                    conv.masdif_version,
                    conv.last_message_updated_at,
                    conv.created_at,
                    conv.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_conversation(db: &Database, id: &str) -> Result<Option<Conversation>, MasdifError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1"),
                params![id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// All conversations, most recently active first.
pub async fn list_conversations(db: &Database) -> Result<Vec<Conversation>, MasdifError> {
    db.connection()
        .call(|conn| -> Result<Vec<Conversation>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM conversations
                 ORDER BY COALESCE(last_message_updated_at, created_at) DESC"
            ))?;
            let rows = stmt.query_map([], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes a conversation; messages and attachments go with it.
pub async fn delete_conversation(db: &Database, id: &str) -> Result<bool, MasdifError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
