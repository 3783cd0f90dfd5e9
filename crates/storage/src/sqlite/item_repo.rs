use async_trait::async_trait;
use drill_core::model::ItemCollection;

use super::{SqliteRepository, mapping::map_item_row, mapping::u64_to_i64};
use crate::repository::{
    ItemStore, StorageError, collection_from_records, records_from_collection,
};

#[async_trait]
impl ItemStore for SqliteRepository {
    async fn load_all(&self) -> Result<ItemCollection, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT position, prompt, answer, group_label, tries, fails, last_step, init_level
            FROM items
            ORDER BY position ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let records = rows
            .iter()
            .map(map_item_row)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(count = records.len(), "loaded items");
        collection_from_records(records)
    }

    async fn save_all(&self, items: &ItemCollection) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query("DELETE FROM items")
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for record in records_from_collection(items) {
            sqlx::query(
                r"
                INSERT INTO items (
                    position, prompt, answer, group_label, tries, fails, last_step, init_level
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
            )
            .bind(u64_to_i64("position", record.position)?)
            .bind(record.prompt)
            .bind(record.answer)
            .bind(record.group)
            .bind(i64::from(record.tries))
            .bind(i64::from(record.fails))
            .bind(u64_to_i64("last_step", record.last_step)?)
            .bind(record.init_level.map(i64::from))
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        tracing::debug!(count = items.len(), "saved items");
        Ok(())
    }
}
