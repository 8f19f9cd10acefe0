// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations.
//!
//! SQL files under `migrations/` are compiled in with `embed_migrations!` and
//! applied on every open. Refinery records applied versions in
//! `refinery_schema_history`.

use masdif_core::MasdifError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Applies all pending migrations.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), MasdifError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(MasdifError::storage)?;
    Ok(())
}
