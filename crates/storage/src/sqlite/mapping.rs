use sqlx::Row;

use crate::repository::{ItemRecord, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

/// Missing history columns read as `0` / unset.
pub(crate) fn map_item_row(row: &sqlx::sqlite::SqliteRow) -> Result<ItemRecord, StorageError> {
    let position = i64_to_u64("position", row.try_get("position").map_err(ser)?)?;
    let tries = row.try_get::<Option<i64>, _>("tries").map_err(ser)?.unwrap_or(0);
    let fails = row.try_get::<Option<i64>, _>("fails").map_err(ser)?.unwrap_or(0);
    let last_step = row
        .try_get::<Option<i64>, _>("last_step")
        .map_err(ser)?
        .unwrap_or(0);
    let init_level = row
        .try_get::<Option<i64>, _>("init_level")
        .map_err(ser)?
        .map(|v| {
            u8::try_from(v)
                .map_err(|_| StorageError::Serialization(format!("invalid init_level: {v}")))
        })
        .transpose()?;

    Ok(ItemRecord {
        position,
        prompt: row.try_get("prompt").map_err(ser)?,
        answer: row.try_get("answer").map_err(ser)?,
        group: row.try_get("group_label").map_err(ser)?,
        tries: i64_to_u32("tries", tries)?,
        fails: i64_to_u32("fails", fails)?,
        last_step: i64_to_u64("last_step", last_step)?,
        init_level,
    })
}
