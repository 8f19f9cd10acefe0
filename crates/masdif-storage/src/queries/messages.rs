// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD operations.
//!
//! JSON-valued fields are stored as TEXT. Every write also bumps the owning
//! conversation's `last_message_updated_at` inside the same transaction.

use std::str::FromStr;

use masdif_core::{Feedback, InputMetadata, MasdifError, Message, MessageExcerpt, TtsResult, now_timestamp};
use rusqlite::{OptionalExtension, params};
use serde_json::Value;

use crate::database::{Database, conversion_err, map_tr_err};

const COLUMNS: &str = "id, conversation_id, text, meta_data, reply, action_reply, nlu, events,
                       feedback, tts_result, time_dialog, time_tts, time_overall,
                       created_at, updated_at";

fn json_col<T: serde::de::DeserializeOwned>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_err(idx, e))
}

fn opt_json_col(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Option<Value>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| serde_json::from_str(&s).map_err(|e| conversion_err(idx, e)))
        .transpose()
}

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let meta_data: InputMetadata = json_col(row, 3)?;
    let tts_result: String = row.get(9)?;
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        text: row.get(2)?,
        meta_data,
        reply: json_col(row, 4)?,
        action_reply: opt_json_col(row, 5)?,
        nlu: opt_json_col(row, 6)?,
        events: json_col(row, 7)?,
        feedback: Feedback::from(row.get::<_, String>(8)?),
        tts_result: TtsResult::from_str(&tts_result).map_err(|e| conversion_err(9, e))?,
        time_dialog: row.get(10)?,
        time_tts: row.get(11)?,
        time_overall: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

/// Column values shared by insert and update, serialized up front so JSON
/// errors surface before touching the connection.
struct Encoded {
    meta_data: String,
    reply: String,
    action_reply: Option<String>,
    nlu: Option<String>,
    events: String,
}

fn encode(msg: &Message) -> Result<Encoded, MasdifError> {
    let to_text = |v: &Value| serde_json::to_string(v).map_err(MasdifError::storage);
    Ok(Encoded {
        meta_data: serde_json::to_string(&msg.meta_data).map_err(MasdifError::storage)?,
        reply: to_text(&msg.reply)?,
        action_reply: msg.action_reply.as_ref().map(to_text).transpose()?,
        nlu: msg.nlu.as_ref().map(to_text).transpose()?,
        events: serde_json::to_string(&msg.events).map_err(MasdifError::storage)?,
    })
}

fn touch_conversation(
    tx: &rusqlite::Transaction<'_>,
    conversation_id: &str,
    at: &str,
) -> rusqlite::Result<()> {
    tx.execute(
        "UPDATE conversations SET last_message_updated_at = ?1, updated_at = ?1 WHERE id = ?2",
        params![at, conversation_id],
    )?;
    Ok(())
}

pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), MasdifError> {
    let enc = encode(msg)?;
    let msg = msg.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                &format!("INSERT INTO messages ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"),
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.text,
                    enc.meta_data,
                    enc.reply,
                    enc.action_reply,
                    enc.nlu,
                    enc.events,
                    msg.feedback.as_str(),
                    msg.tts_result.to_string(),
                    msg.time_dialog,
                    msg.time_tts,
                    msg.time_overall,
                    msg.created_at,
                    msg.updated_at,
                ],
            )?;
            touch_conversation(&tx, &msg.conversation_id, &msg.updated_at)?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrites every mutable column of an existing message.
pub async fn update_message(db: &Database, msg: &Message) -> Result<(), MasdifError> {
    let enc = encode(msg)?;
    let msg = msg.clone();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE messages SET text = ?1, meta_data = ?2, reply = ?3, action_reply = ?4,
                        nlu = ?5, events = ?6, feedback = ?7, tts_result = ?8,
                        time_dialog = ?9, time_tts = ?10, time_overall = ?11, updated_at = ?12
                 WHERE id = ?13",
                params![
                    msg.text,
                    enc.meta_data,
                    enc.reply,
                    enc.action_reply,
                    enc.nlu,
                    enc.events,
                    msg.feedback.as_str(),
                    msg.tts_result.to_string(),
                    msg.time_dialog,
                    msg.time_tts,
                    msg.time_overall,
                    now,
                    msg.id,
                ],
            )?;
            touch_conversation(&tx, &msg.conversation_id, &now)?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_message(
    db: &Database,
    conversation_id: &str,
    message_id: &str,
) -> Result<Option<Message>, MasdifError> {
    let conversation_id = conversation_id.to_string();
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM messages WHERE id = ?1 AND conversation_id = ?2"),
                params![message_id, conversation_id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Messages of a conversation in chronological order.
pub async fn get_messages_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Message>, MasdifError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM messages WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Sets the feedback column. Returns `false` when the message is not part of the conversation.
pub async fn set_feedback(
    db: &Database,
    conversation_id: &str,
    message_id: &str,
    feedback: &str,
) -> Result<bool, MasdifError> {
    let conversation_id = conversation_id.to_string();
    let message_id = message_id.to_string();
    let feedback = feedback.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE messages SET feedback = ?1, updated_at = ?2
                 WHERE id = ?3 AND conversation_id = ?4",
                params![feedback, now, message_id, conversation_id],
            )?;
            if changed > 0 {
                touch_conversation(&tx, &conversation_id, &now)?;
            }
            tx.commit()?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// User-facing messages of a conversation. Control messages (`/...`) are skipped.
pub async fn list_excerpts(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<MessageExcerpt>, MasdifError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<MessageExcerpt>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, text, feedback, created_at FROM messages
                 WHERE conversation_id = ?1 AND substr(text, 1, 1) != '/'
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], |row| {
                Ok(MessageExcerpt {
                    message_id: row.get(0)?,
                    text: row.get(1)?,
                    feedback: Feedback::from(row.get::<_, String>(2)?),
                    created_at: row.get(3)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
