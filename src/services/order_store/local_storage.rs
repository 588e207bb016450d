//! Orders kept under a single key of the device-local key/value storage.
//!
//! Data written here stays on the machine that wrote it; another deployment
//! cannot see these orders.

use super::{OrderStore, StoreResult, apply_status};
use crate::{models::order::Order, services::local_storage::LocalStorage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub const STORAGE_KEY: &str = "printOrders";

#[derive(Clone, Debug)]
pub struct LocalStorageOrderStore {
    storage: LocalStorage,
}

impl LocalStorageOrderStore {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    async fn read_orders(&self) -> StoreResult<Vec<Order>> {
        match self.storage.get_item(STORAGE_KEY).await? {
            Some(json) if !json.trim().is_empty() => Ok(serde_json::from_str(&json)?),
            _ => Ok(Vec::new()),
        }
    }

    async fn write_orders(&self, orders: &[Order]) -> StoreResult<()> {
        let json = serde_json::to_string(orders)?;
        self.storage.set_item(STORAGE_KEY, &json).await?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for LocalStorageOrderStore {
    fn backend_name(&self) -> &'static str {
        "local-storage"
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
        match apply_status(&mut orders, order_id, status, at) {
            Some(updated) => {
                self.write_orders(&orders).await?;
                Ok(Some(updated))
            }
            None => Ok(None),
        }
    }

    async fn delete_all_orders(&self) -> StoreResult<()> {
        self.storage.remove_item(STORAGE_KEY).await?;
        Ok(())
    }

    async fn replace_all(&self, orders: Vec<Order>) -> StoreResult<()> {
        self.write_orders(&orders).await
    }

    async fn check_ready(&self) -> StoreResult<()> {
        self.read_orders().await.map(|_| ())
    }
}
