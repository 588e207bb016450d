//! Orders kept as one pretty-printed JSON array on local disk.
//!
//! Every write rewrites the whole file. There is no locking, so two requests
//! doing read-modify-write at the same time can lose one of the updates.

use super::{OrderStore, StoreResult, apply_status};
use crate::{models::order::Order, services::atomic_file::write_atomic};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{io::ErrorKind, path::PathBuf};
use tokio::fs;
use tracing::{debug, info};

pub const ORDERS_FILE_NAME: &str = "orders.json";

#[derive(Clone, Debug)]
pub struct JsonFileOrderStore {
    path: PathBuf,
}

impl JsonFileOrderStore {
    /// Open the store under `data_dir`, creating the directory and an empty
    /// `orders.json` when they do not exist yet.
    pub async fn open(data_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).await?;

        let path = data_dir.join(ORDERS_FILE_NAME);
        match fs::metadata(&path).await {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                write_atomic(&path, b"[]").await?;
                info!("Initialized empty order file at {}", path.display());
            }
            Err(err) => return Err(err.into()),
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn read_orders(&self) -> StoreResult<Vec<Order>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_orders(&self, orders: &[Order]) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(orders)?;
        write_atomic(&self.path, &json).await?;
        debug!("wrote {} orders to {}", orders.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl OrderStore for JsonFileOrderStore {
    fn backend_name(&self) -> &'static str {
        "json-file"
    }

    async fn create_order(&self, order: Order) -> StoreResult<Order> {
        let mut orders = self.read_orders().await?;
        orders.push(order.clone());
        self.write_orders(&orders).await?;
        Ok(order)
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        self.read_orders().await
    }

    async fn get_order(&self, order_id: &str) -> StoreResult<Option<Order>> {
        let orders = self.read_orders().await?;
        Ok(orders.into_iter().find(|o| o.order_id == order_id))
    }

    async fn update_status(
        &self,
        order_id: &str,
        status: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Order>> {
        let mut orders = self.read_orders().await?;
        let Some(updated) = apply_status(&mut orders, order_id, status, at) else {
            return Ok(None);
        };
        self.write_orders(&orders).await?;
        Ok(Some(updated))
    }

    async fn delete_all_orders(&self) -> StoreResult<()> {
        self.write_orders(&[]).await
    }

    async fn replace_all(&self, orders: Vec<Order>) -> StoreResult<()> {
        self.write_orders(&orders).await
    }

    async fn check_ready(&self) -> StoreResult<()> {
        self.read_orders().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{StoreError, contract};
    use super::*;

    async fn store() -> (tempfile::TempDir, JsonFileOrderStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileOrderStore::open(dir.path().join("data"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn open_initializes_empty_array() {
        let (_dir, store) = store().await;
        let raw = fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(raw, "[]");
    }

    #[tokio::test]
    async fn round_trip() {
        let (_dir, store) = store().await;
        contract::round_trip(&store).await;
    }

    #[tokio::test]
    async fn keeps_insertion_order_and_duplicates() {
        let (_dir, store) = store().await;
        contract::keeps_insertion_order_and_duplicates(&store).await;
    }

    #[tokio::test]
    async fn update_status_touches_only_status() {
        let (_dir, store) = store().await;
        contract::update_status_touches_only_status(&store).await;
    }

    #[tokio::test]
    async fn delete_all_then_create() {
        let (_dir, store) = store().await;
        contract::delete_all_then_create(&store).await;
    }

    #[tokio::test]
    async fn replace_all_swaps_collection() {
        let (_dir, store) = store().await;
        contract::replace_all_swaps_collection(&store).await;
    }

    #[tokio::test]
    async fn file_is_pretty_printed_and_reopens() {
        let (dir, store) = store().await;
        store
            .create_order(contract::sample("O1", "2024-01-01", "pending"))
            .await
            .unwrap();

        let raw = fs::read_to_string(store.path()).await.unwrap();
        assert!(raw.starts_with("[\n"));
        assert!(raw.contains("\"orderId\": \"O1\""));

        let reopened = JsonFileOrderStore::open(dir.path().join("data"))
            .await
            .unwrap();
        assert_eq!(reopened.list_orders().await.unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn open_surfaces_unreadable_file_without_resetting_it() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        let path = data_dir.join(ORDERS_FILE_NAME);
        // A self-referencing symlink fails `metadata` with something other than NotFound.
        std::os::unix::fs::symlink(&path, &path).unwrap();

        let err = JsonFileOrderStore::open(data_dir.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(std::fs::symlink_metadata(&path).unwrap().is_symlink());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error_and_is_not_overwritten() {
        let (_dir, store) = store().await;
        fs::write(store.path(), b"{ not json").await.unwrap();

        let err = store
            .create_order(contract::sample("O1", "2024-01-01", "pending"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
        assert_eq!(fs::read(store.path()).await.unwrap(), b"{ not json");
        assert!(store.check_ready().await.is_err());
    }
}
