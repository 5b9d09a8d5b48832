//! SQLite-backed record store.
//!
//! # Responsibility
//! - Persist schema-loose records in the `records` table with extracted
//!   indexed columns and a JSON field payload.
//! - Implement the full `RecordStore` contract on a migrated connection.
//!
//! # Invariants
//! - `save` is an upsert keyed by `record_id`; whole-record last-write-wins.
//! - Query sorting touches only the extracted indexed columns.
//! - The adapter holds no cache; every call hits the connection.

use crate::record::{keys, FieldValue, Record, RecordId, RecordKind};
use crate::store::{BatchResult, RecordStore, SortDirection, SortField, SortKey, StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Record store persisted in a single SQLite table.
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    /// Wraps a migrated connection, verifying schema readiness first.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_store_ready(&conn)?;
        Ok(Self { conn })
    }
}

impl RecordStore for SqliteRecordStore {
    fn check_availability(&self) -> StoreResult<()> {
        // A broken connection maps to the indeterminate account status.
        self.conn
            .query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))
            .map_err(|_| StoreError::AccountUnknown)?;
        Ok(())
    }

    fn save(&mut self, record: &Record) -> StoreResult<()> {
        save_on(&self.conn, record)
    }

    fn fetch(&self, id: RecordId) -> StoreResult<Record> {
        let row = self
            .conn
            .query_row(
                "SELECT kind, payload FROM records WHERE record_id = ?1;",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((kind_text, payload)) => parse_stored_record(id.to_string(), kind_text, payload),
            None => Err(StoreError::NotFound(id)),
        }
    }

    fn delete(&mut self, id: RecordId) -> StoreResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM records WHERE record_id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn save_many(&mut self, records: &[Record]) -> StoreResult<Vec<BatchResult>> {
        // Deliberately no transaction: each record succeeds or fails on its
        // own, matching the remote contract.
        let mut results = Vec::with_capacity(records.len());
        for record in records {
            results.push((record.id, save_on(&self.conn, record)));
        }
        Ok(results)
    }

    fn query(&self, kind: RecordKind, sort: &[SortKey]) -> StoreResult<Vec<Record>> {
        let mut sql = String::from(
            "SELECT record_id, kind, payload
             FROM records
             WHERE kind = ?1
               AND title != ''",
        );
        sql.push_str(" ORDER BY ");
        for key in sort {
            sql.push_str(sort_column(key.field));
            sql.push_str(match key.direction {
                SortDirection::Ascending => " ASC, ",
                SortDirection::Descending => " DESC, ",
            });
        }
        // Stable tiebreak so equal keys return in deterministic order.
        sql.push_str("record_id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([kind.as_db()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            let kind_text: String = row.get(1)?;
            let payload: String = row.get(2)?;
            records.push(parse_stored_record(id_text, kind_text, payload)?);
        }
        Ok(records)
    }
}

fn save_on(conn: &Connection, record: &Record) -> StoreResult<()> {
    let payload = serde_json::to_string(record.fields())?;
    let title = record.text(keys::TITLE).unwrap_or("");
    let priority = record.integer(keys::PRIORITY);
    let created_at = record.integer(keys::CREATED_AT);
    let deleted_at = record.integer(keys::DELETED_AT);

    conn.execute(
        "INSERT INTO records (record_id, kind, title, priority, created_at, deleted_at, payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(record_id) DO UPDATE SET
            kind = excluded.kind,
            title = excluded.title,
            priority = excluded.priority,
            created_at = excluded.created_at,
            deleted_at = excluded.deleted_at,
            payload = excluded.payload;",
        params![
            record.id.to_string(),
            record.kind.as_db(),
            title,
            priority,
            created_at,
            deleted_at,
            payload,
        ],
    )?;
    Ok(())
}

fn parse_stored_record(
    id_text: String,
    kind_text: String,
    payload: String,
) -> StoreResult<Record> {
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        StoreError::Backend(format!("invalid uuid value `{id_text}` in records.record_id"))
    })?;
    let kind = RecordKind::from_db(&kind_text).ok_or_else(|| {
        StoreError::Backend(format!("invalid kind value `{kind_text}` in records.kind"))
    })?;
    let fields: BTreeMap<String, FieldValue> = serde_json::from_str(&payload)?;
    Ok(Record::from_fields(id, kind, fields))
}

fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::Priority => "priority",
        SortField::CreatedAt => "created_at",
        SortField::DeletedAt => "deleted_at",
    }
}

fn ensure_store_ready(conn: &Connection) -> StoreResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'records'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(StoreError::Backend(
            "records table missing; store connection is not migrated".to_string(),
        ));
    }
    Ok(())
}
