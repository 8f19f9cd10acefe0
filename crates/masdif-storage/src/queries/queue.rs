// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted delayed-job queue.
//!
//! Entries become visible to [`dequeue`] once `run_after` has passed. A claimed
//! entry is locked for five minutes; if the worker dies before acking, the
//! lock expires and the entry is handed out again.

use masdif_core::{MasdifError, QueueEntry};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Enqueues a job due at `run_after`. Returns the new entry id.
pub async fn enqueue(
    db: &Database,
    queue_name: &str,
    payload: &str,
    run_after: &str,
) -> Result<i64, MasdifError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    let run_after = run_after.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO queue (queue_name, payload, run_after) VALUES (?1, ?2, ?3)",
                params![queue_name, payload, run_after],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Claims the oldest due entry of the named queue, marking it `processing`.
pub async fn dequeue(db: &Database, queue_name: &str) -> Result<Option<QueueEntry>, MasdifError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<QueueEntry>, rusqlite::Error> {
            let tx = conn.transaction()?;

            let entry = tx
                .query_row(
                    "SELECT id, queue_name, payload, status, attempts, max_attempts,
                            run_after, created_at, updated_at, locked_until
                     FROM queue
                     WHERE queue_name = ?1
                       AND run_after <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                       AND (status = 'pending'
                            OR (status = 'processing'
                                AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now')))
                     ORDER BY run_after ASC, id ASC
                     LIMIT 1",
                    params![queue_name],
                    |row| {
                        Ok(QueueEntry {
                            id: row.get(0)?,
                            queue_name: row.get(1)?,
                            payload: row.get(2)?,
                            status: row.get(3)?,
                            attempts: row.get(4)?,
                            max_attempts: row.get(5)?,
                            run_after: row.get(6)?,
                            created_at: row.get(7)?,
                            updated_at: row.get(8)?,
                            locked_until: row.get(9)?,
                        })
                    },
                )
                .optional()?;

            let Some(entry) = entry else {
                tx.commit()?;
                return Ok(None);
            };

            let locked_until: String = tx.query_row(
                "UPDATE queue SET status = 'processing',
                 locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+5 minutes'),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1
                 RETURNING locked_until",
                params![entry.id],
                |row| row.get(0),
            )?;
            tx.commit()?;

            Ok(Some(QueueEntry {
                status: "processing".to_string(),
                locked_until: Some(locked_until),
                ..entry
            }))
        })
        .await
        .map_err(map_tr_err)
}

/// Removes a finished entry.
pub async fn ack(db: &Database, id: i64) -> Result<(), MasdifError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM queue WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Records a failed attempt: back to `pending`, or `failed` once attempts run out.
pub async fn fail(db: &Database, id: i64) -> Result<(), MasdifError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE queue SET attempts = attempts + 1,
                 status = CASE WHEN attempts + 1 >= max_attempts THEN 'failed' ELSE 'pending' END,
                 locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes `failed` entries of the named queue last touched before `cutoff`.
pub async fn prune_failed(db: &Database, queue_name: &str, cutoff: &str) -> Result<usize, MasdifError> {
    let queue_name = queue_name.to_string();
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM queue WHERE queue_name = ?1 AND status = 'failed' AND updated_at < ?2",
                params![queue_name, cutoff],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Number of rows held for the named queue, whatever their status.
pub async fn depth(db: &Database, queue_name: &str) -> Result<usize, MasdifError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM queue WHERE queue_name = ?1",
                params![queue_name],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as usize)
        })
        .await
        .map_err(map_tr_err)
}
