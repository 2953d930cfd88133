//! Staging/merge load protocol.
//!
//! Batches are loaded in four steps: create a uniquely named staging
//! table, populate it with multi-row inserts sized under the bind-parameter
//! limit, fold it into the durable table with one merge statement, and
//! drop the staging table. The drop runs whether or not the load
//! succeeded, and a failed drop never masks the load outcome. Loading the
//! same rows twice converges to identical durable state.

use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use crate::error::{Result, WarehouseError};
use crate::schema::TableSpec;

/// Maximum bind parameters per SQLite statement.
pub const MAX_BIND_PARAMS: usize = 999;

/// A row that can be staged into a table described by a [`TableSpec`].
pub trait StageRow {
    /// Bind values in the spec's column order.
    fn bind_values(&self) -> Vec<Value>;
}

/// Stage `rows` into a transient table and merge them into the spec's
/// durable table. Returns the number of rows the merge touched.
///
/// The durable table must already exist.
pub fn stage_and_merge<R: StageRow>(
    conn: &Connection,
    spec: &TableSpec,
    rows: &[R],
) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let staging = spec.staging_name(Utc::now().timestamp_millis());
    conn.execute(&spec.create_sql(&staging), [])
        .map_err(|source| WarehouseError::Staging {
            table: staging.clone(),
            source,
        })?;

    let outcome = populate_and_merge(conn, spec, &staging, rows);

    // Unconditional cleanup; an orphaned staging table costs storage but
    // never correctness.
    if let Err(error) = conn.execute(&TableSpec::drop_sql(&staging), []) {
        eprintln!("Warning: failed to drop staging table {}: {}", staging, error);
    }

    outcome
}

fn populate_and_merge<R: StageRow>(
    conn: &Connection,
    spec: &TableSpec,
    staging: &str,
    rows: &[R],
) -> Result<usize> {
    let chunk_rows = spec.rows_per_insert(MAX_BIND_PARAMS);

    let tx = conn
        .unchecked_transaction()
        .map_err(|source| WarehouseError::Staging {
            table: staging.to_string(),
            source,
        })?;

    for chunk in rows.chunks(chunk_rows) {
        let sql = spec.insert_sql(staging, chunk.len());
        let values: Vec<Value> = chunk.iter().flat_map(StageRow::bind_values).collect();
        tx.execute(&sql, params_from_iter(values))
            .map_err(|source| WarehouseError::Staging {
                table: staging.to_string(),
                source,
            })?;
    }

    tx.commit().map_err(|source| WarehouseError::Staging {
        table: staging.to_string(),
        source,
    })?;

    let merged = conn
        .execute(&spec.merge_sql(staging), [])
        .map_err(|source| WarehouseError::Merge {
            table: spec.name.to_string(),
            rows: rows.len(),
            source,
        })?;

    Ok(merged)
}
